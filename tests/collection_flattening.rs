// tests/collection_flattening.rs

mod common;
use crate::common::{init_tracing, text, with_timeout, TestProject};

use std::collections::HashMap;
use std::error::Error;
use std::f64::consts::FRAC_1_SQRT_2;

use assetforge::builders::math::{Quat, Vec3};
use assetforge::builders::properties::hash_property;
use assetforge::builders::{
    CollectionDesc, GameObjectDesc, InstanceDesc, PropertyDesc, PropertyType, PropertyValue,
};
use assetforge::errors::BuildError;

type TestResult = Result<(), Box<dyn Error>>;

const EPSILON: f64 = 1e-6;

/// Every instance uses p = (1, 0, 0), r = 90 degrees around Y, s = 0.5.
fn transform() -> String {
    format!(
        "position = [1.0, 0.0, 0.0]\nrotation = [0.0, {s}, 0.0, {s}]\nscale = 0.5\n",
        s = FRAC_1_SQRT_2
    )
}

fn instance(id: &str, children: &[&str]) -> String {
    let children: Vec<String> = children.iter().map(|c| format!("\"{c}\"")).collect();
    format!(
        "\n[[instances]]\nid = \"{id}\"\nprototype = \"/test.go\"\n{}children = [{}]\n",
        transform(),
        children.join(", ")
    )
}

fn collection_instance(id: &str, collection: &str) -> String {
    format!(
        "\n[[collection_instances]]\nid = \"{id}\"\ncollection = \"{collection}\"\n{}",
        transform()
    )
}

fn assert_vec(actual: Vec3, expected: Vec3) {
    assert!(
        (actual.x - expected.x).abs() < EPSILON
            && (actual.y - expected.y).abs() < EPSILON
            && (actual.z - expected.z).abs() < EPSILON,
        "{actual:?} != {expected:?}"
    );
}

fn assert_quat(actual: Quat, expected: Quat) {
    assert!(
        (actual.x - expected.x).abs() < EPSILON
            && (actual.y - expected.y).abs() < EPSILON
            && (actual.z - expected.z).abs() < EPSILON
            && (actual.w - expected.w).abs() < EPSILON,
        "{actual:?} != {expected:?}"
    );
}

fn compiled(project: &TestProject, path: &str) -> Result<CollectionDesc, Box<dyn Error>> {
    Ok(toml::from_str(&text(project, path))?)
}

fn by_id(desc: &CollectionDesc) -> HashMap<&str, &InstanceDesc> {
    desc.instances.iter().map(|i| (i.id.as_str(), i)).collect()
}

#[tokio::test]
async fn nested_collections_are_flattened_with_composed_transforms() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file("test.go", "");
    project.file(
        "sub_sub.collection",
        &format!("name = \"sub_sub\"\n{}", instance("test", &[])),
    );
    project.file(
        "sub.collection",
        &format!(
            "name = \"sub\"\n{}{}",
            collection_instance("sub_sub", "/sub_sub.collection"),
            instance("test", &[])
        ),
    );
    project.file(
        "test.collection",
        &format!(
            "name = \"main\"\n{}{}",
            collection_instance("sub", "/sub.collection"),
            instance("test", &[])
        ),
    );

    let report = with_timeout(project.build()).await?;
    assert!(report.is_success(), "{report}");

    let desc = compiled(&project, "build/test.collectionc")?;
    assert_eq!(desc.name, "main");
    assert_eq!(desc.instances.len(), 3);
    let instances = by_id(&desc);

    let top = instances["/test"];
    assert_eq!(top.prototype, "/test.goc");
    assert_vec(top.position, Vec3::new(1.0, 0.0, 0.0));
    assert_quat(top.rotation, Quat::new(0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2));
    assert!((top.scale - 0.5).abs() < EPSILON);

    let sub = instances["/sub/test"];
    assert_vec(sub.position, Vec3::new(1.0, 0.0, -0.5));
    assert_quat(sub.rotation, Quat::new(0.0, 1.0, 0.0, 0.0));
    assert!((sub.scale - 0.25).abs() < EPSILON);

    let sub_sub = instances["/sub/sub_sub/test"];
    assert_vec(sub_sub.position, Vec3::new(0.5, 0.0, -0.5));
    assert_quat(
        sub_sub.rotation,
        Quat::new(0.0, FRAC_1_SQRT_2, 0.0, -FRAC_1_SQRT_2),
    );
    assert!((sub_sub.scale - 0.125).abs() < EPSILON);
    Ok(())
}

#[tokio::test]
async fn children_keep_their_local_transform() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file("test.go", "");
    project.file(
        "sub.collection",
        &format!(
            "name = \"sub\"\n{}{}",
            instance("child", &[]),
            instance("parent", &["child"])
        ),
    );
    project.file(
        "test.collection",
        &format!(
            "name = \"main\"\n{}",
            collection_instance("sub", "/sub.collection")
        ),
    );

    with_timeout(project.build()).await?;
    let desc = compiled(&project, "build/test.collectionc")?;
    assert_eq!(desc.instances.len(), 2);
    let instances = by_id(&desc);

    let parent = instances["/sub/parent"];
    assert_vec(parent.position, Vec3::new(1.0, 0.0, -0.5));
    assert_quat(parent.rotation, Quat::new(0.0, 1.0, 0.0, 0.0));
    assert!((parent.scale - 0.25).abs() < EPSILON);
    assert_eq!(parent.children, vec!["/sub/child".to_string()]);

    let child = instances["/sub/child"];
    assert_vec(child.position, Vec3::new(1.0, 0.0, 0.0));
    assert_quat(
        child.rotation,
        Quat::new(0.0, FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2),
    );
    assert!((child.scale - 0.5).abs() < EPSILON);
    Ok(())
}

#[tokio::test]
async fn editing_a_sub_collection_rebuilds_its_parents() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file("test.go", "");
    project.file(
        "leaf.collection",
        &format!("name = \"leaf\"\n{}", instance("test", &[])),
    );
    project.file(
        "main.collection",
        &format!(
            "name = \"main\"\n{}",
            collection_instance("leaf", "/leaf.collection")
        ),
    );
    with_timeout(project.build()).await?;

    project.file(
        "leaf.collection",
        &format!("name = \"leaf\"\n{}", instance("moved", &[])),
    );
    let report = with_timeout(project.build()).await?;
    assert_eq!(report.built, 2);
    assert_eq!(report.up_to_date, 1);

    let desc = compiled(&project, "build/main.collectionc")?;
    assert_eq!(desc.instances[0].id, "/leaf/moved");
    Ok(())
}

#[tokio::test]
async fn embedded_instances_become_generated_game_objects() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "main.collection",
        r#"name = "main"

[[embedded_instances]]
id = "camera"
data = """
[[components]]
id = "cam"
component = "/camera.camera"
"""
"#,
    );

    let report = with_timeout(project.build()).await?;
    assert_eq!(report.built, 2, "{report}");

    let desc = compiled(&project, "build/main.collectionc")?;
    assert_eq!(desc.instances[0].id, "/camera");
    assert_eq!(desc.instances[0].prototype, "/build/main_generated_0.goc");

    let go: GameObjectDesc = toml::from_str(&text(&project, "build/main_generated_0.goc"))?;
    assert_eq!(go.components[0].id, "cam");
    assert_eq!(go.components[0].component, "/camera.camerac");
    Ok(())
}

#[tokio::test]
async fn circular_collections_are_rejected() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "a.collection",
        &format!("name = \"a\"\n{}", collection_instance("b", "/b.collection")),
    );
    project.file(
        "b.collection",
        &format!("name = \"b\"\n{}", collection_instance("a", "/a.collection")),
    );

    let err = with_timeout(project.build()).await.unwrap_err();
    match err {
        BuildError::Compile(e) => assert!(e.message.contains("includes itself"), "{e}"),
        other => panic!("expected compile error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_sub_collection_is_a_compile_error() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "main.collection",
        &format!(
            "name = \"main\"\n{}",
            collection_instance("gone", "/gone.collection")
        ),
    );

    let err = with_timeout(project.build()).await.unwrap_err();
    assert!(matches!(err, BuildError::Compile(_)), "got {err:?}");
    Ok(())
}

fn with_properties(properties: &[&str]) -> String {
    format!(
        "name = \"main\"\n\n[[instances]]\nid = \"test\"\nprototype = \"/test.go\"\n\n\
         [[instances.component_properties]]\nid = \"script\"\nproperties = [\n{}\n]\n",
        properties.join(",\n")
    )
}

#[tokio::test]
async fn component_properties_are_compiled_by_type() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "main.collection",
        &with_properties(&[
            r#"{ id = "number", type = "number", value = "1" }"#,
            r#"{ id = "hash", type = "hash", value = "hash" }"#,
            r#"{ id = "url", type = "url", value = "url" }"#,
            r#"{ id = "vec3", type = "vector3", value = "1, 2, 3" }"#,
            r#"{ id = "vec4", type = "vector4", value = "4, 5, 6, 7" }"#,
            r#"{ id = "quat", type = "quat", value = "8, 9, 10, 11" }"#,
        ]),
    );

    let report = with_timeout(project.build()).await?;
    assert!(report.is_success(), "{report}");

    let desc = compiled(&project, "build/main.collectionc")?;
    let component = &desc.instances[0].component_properties[0];
    assert_eq!(component.id, "script");

    let property = |id: &str, kind: PropertyType, value: PropertyValue| PropertyDesc {
        id: id.to_string(),
        kind,
        value,
    };
    assert_eq!(
        component.properties,
        vec![
            property("number", PropertyType::Number, PropertyValue::Number(1.0)),
            property(
                "hash",
                PropertyType::Hash,
                PropertyValue::Text(hash_property("hash"))
            ),
            property("url", PropertyType::Url, PropertyValue::Text("url".into())),
            property(
                "vec3",
                PropertyType::Vector3,
                PropertyValue::Vector(vec![1.0, 2.0, 3.0])
            ),
            property(
                "vec4",
                PropertyType::Vector4,
                PropertyValue::Vector(vec![4.0, 5.0, 6.0, 7.0])
            ),
            property(
                "quat",
                PropertyType::Quat,
                PropertyValue::Vector(vec![8.0, 9.0, 10.0, 11.0])
            ),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn invalid_property_value_is_a_compile_error_with_its_line() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "main.collection",
        &with_properties(&[r#"{ id = "number", type = "number", value = "a" }"#]),
    );

    let report = with_timeout(project.build()).await?;
    assert_eq!(report.failed, 1);
    assert!(!report.aborted);
    let failure = report.failures().next().ok_or("missing failure")?;
    assert_eq!(failure.line, Some(10));
    assert!(
        failure.message.as_deref().unwrap_or("").contains("invalid value 'a'"),
        "{failure:?}"
    );
    assert!(project.read("build/main.collectionc").is_none());
    Ok(())
}

#[tokio::test]
async fn vector_property_with_missing_components_is_rejected() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "main.collection",
        &with_properties(&[r#"{ id = "rot", type = "quat", value = "1, 2, 3" }"#]),
    );

    let report = with_timeout(project.build()).await?;
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures().next().and_then(|f| f.line), Some(10));
    Ok(())
}

#[tokio::test]
async fn duplicate_component_id_reports_its_line() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file(
        "hero.go",
        "[[components]]\nid = \"a\"\ncomponent = \"/x.sprite\"\n\n[[components]]\nid = \"a\"\ncomponent = \"/y.sprite\"\n",
    );

    let report = with_timeout(project.build()).await?;
    let failure = report.failures().next().expect("one failure");
    assert_eq!(failure.line, Some(6));
    assert_eq!(failure.message.as_deref(), Some("duplicate component id 'a'"));
    Ok(())
}

#[tokio::test]
async fn malformed_game_object_reports_a_line() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file("hero.go", "[[components]]\nid = \n");

    let report = with_timeout(project.build()).await?;
    assert_eq!(report.failed, 1);
    assert!(!report.aborted);
    assert!(report.failures().next().and_then(|f| f.line).is_some());
    Ok(())
}

#[tokio::test]
async fn scripts_are_validated_and_normalized() -> TestResult {
    init_tracing();
    let project = TestProject::new();
    project.file("ok.lua", "a = 1\r\nb = 2\r\n");
    project
        .fs
        .add_file("bad.script", b"print(1)\nprint(2)\n\xff oops\n".to_vec());

    let report = with_timeout(project.build()).await?;
    assert_eq!(text(&project, "build/ok.luac"), "a = 1\nb = 2\n");

    let failure = report.failures().next().expect("one failure");
    assert_eq!(failure.line, Some(3));
    assert!(project.read("build/bad.scriptc").is_none());
    Ok(())
}
