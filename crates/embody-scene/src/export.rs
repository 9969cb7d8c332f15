//! JSON views of a [`Scene`] for the transport layer.
//!
//! Every view is a [`serde_json::Value`]; callers serialise it outside any
//! lock.  Vectors are `{x, y, z}` objects, quaternions `{w, x, y, z}`,
//! timestamps epoch milliseconds, and every number is truncated (not
//! rounded) to four decimals.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};

use embody_types::{EmbodyError, JointType, Quaternion, Vec3};

use crate::joint::{Joint, SensorNode};
use crate::scene::Scene;

/// A serialisable property of a [`Joint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    JointType,
    Parent,
    Children,
    AbsolutePosition,
    AbsoluteOrientation,
    RelativePosition,
    RelativeOrientation,
    PositionConfidence,
    OrientationConfidence,
    PositionTracked,
    OrientationTracked,
    PositionTimestamp,
    OrientationTimestamp,
    DefaultPosition,
    DefaultOrientation,
}

impl Field {
    /// Every field, in output order.
    pub const ALL: &'static [Field] = &[
        Field::JointType,
        Field::Parent,
        Field::Children,
        Field::AbsolutePosition,
        Field::AbsoluteOrientation,
        Field::RelativePosition,
        Field::RelativeOrientation,
        Field::PositionConfidence,
        Field::OrientationConfidence,
        Field::PositionTracked,
        Field::OrientationTracked,
        Field::PositionTimestamp,
        Field::OrientationTimestamp,
        Field::DefaultPosition,
        Field::DefaultOrientation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::JointType => "joint_type",
            Field::Parent => "parent",
            Field::Children => "children",
            Field::AbsolutePosition => "absolute_position",
            Field::AbsoluteOrientation => "absolute_orientation",
            Field::RelativePosition => "relative_position",
            Field::RelativeOrientation => "relative_orientation",
            Field::PositionConfidence => "position_confidence",
            Field::OrientationConfidence => "orientation_confidence",
            Field::PositionTracked => "position_tracked",
            Field::OrientationTracked => "orientation_tracked",
            Field::PositionTimestamp => "position_timestamp",
            Field::OrientationTimestamp => "orientation_timestamp",
            Field::DefaultPosition => "default_position",
            Field::DefaultOrientation => "default_orientation",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = EmbodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| EmbodyError::InvalidArgument {
                key: "field".to_string(),
                value: s.to_string(),
            })
    }
}

/// Shape of a joint export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Root joints with child joints nested under `children`.
    Hierarchical,
    /// Every joint at the top level; `children` and `parent` are joint names.
    List,
}

impl FromStr for Layout {
    type Err = EmbodyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "hierarchical" => Ok(Layout::Hierarchical),
            "list" => Ok(Layout::List),
            other => Err(EmbodyError::InvalidArgument {
                key: "layout".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

const HIERARCHY_FIELDS: &[Field] = &[
    Field::JointType,
    Field::Children,
    Field::AbsolutePosition,
    Field::AbsoluteOrientation,
    Field::RelativePosition,
    Field::RelativeOrientation,
    Field::PositionConfidence,
    Field::OrientationConfidence,
    Field::PositionTracked,
    Field::OrientationTracked,
    Field::PositionTimestamp,
    Field::OrientationTimestamp,
];

const LIST_FIELDS: &[Field] = &[
    Field::JointType,
    Field::Parent,
    Field::AbsolutePosition,
    Field::AbsoluteOrientation,
    Field::RelativePosition,
    Field::RelativeOrientation,
    Field::PositionConfidence,
    Field::OrientationConfidence,
    Field::PositionTracked,
    Field::OrientationTracked,
    Field::PositionTimestamp,
    Field::OrientationTimestamp,
];

// ────────────────────────────────────────────────────────────────────────────
// Value helpers
// ────────────────────────────────────────────────────────────────────────────

fn trunc4(v: f64) -> f64 {
    (v * 1e4).trunc() / 1e4
}

fn vec_value(v: Vec3) -> Value {
    json!({ "x": trunc4(v.x), "y": trunc4(v.y), "z": trunc4(v.z) })
}

fn quat_value(q: Quaternion) -> Value {
    json!({ "w": trunc4(q.w), "x": trunc4(q.x), "y": trunc4(q.y), "z": trunc4(q.z) })
}

fn millis(t: DateTime<Utc>) -> Value {
    json!(t.timestamp_millis())
}

fn joint_value(scene: &Scene, joint: &Joint, fields: &[Field], layout: Layout) -> Value {
    let jt = joint.joint_type();
    let mut out = Map::new();
    for &field in Field::ALL.iter().filter(|f| fields.contains(f)) {
        let value = match field {
            Field::JointType => json!(jt),
            Field::Parent => json!(joint.parent()),
            Field::Children => match layout {
                Layout::Hierarchical => Value::Array(
                    joint
                        .child_joints()
                        .filter_map(|c| scene.joint(c))
                        .map(|c| joint_value(scene, c, fields, layout))
                        .collect(),
                ),
                Layout::List => json!(joint.child_joints().collect::<Vec<_>>()),
            },
            Field::AbsolutePosition => vec_value(scene.absolute_position(jt).unwrap_or_default()),
            Field::AbsoluteOrientation => {
                quat_value(scene.absolute_orientation(jt).unwrap_or_default())
            }
            Field::RelativePosition => vec_value(scene.relative_position(jt).unwrap_or_default()),
            Field::RelativeOrientation => {
                quat_value(scene.relative_orientation(jt).unwrap_or_default())
            }
            Field::PositionConfidence => json!(trunc4(joint.position_confidence)),
            Field::OrientationConfidence => json!(trunc4(joint.orientation_confidence)),
            Field::PositionTracked => json!(joint.position_tracked),
            Field::OrientationTracked => json!(joint.orientation_tracked),
            Field::PositionTimestamp => millis(joint.position_timestamp()),
            Field::OrientationTimestamp => millis(joint.orientation_timestamp()),
            Field::DefaultPosition => vec_value(joint.default_position()),
            Field::DefaultOrientation => quat_value(joint.default_orientation()),
        };
        out.insert(field.as_str().to_string(), value);
    }
    Value::Object(out)
}

fn sensor_value(scene: &Scene, sensor: &SensorNode) -> Value {
    let key = sensor.key();
    json!({
        "id": sensor.id(),
        "kind": sensor.kind(),
        "parent": sensor.parent(),
        "absolute_position": vec_value(scene.absolute_position(key).unwrap_or_default()),
        "absolute_orientation": quat_value(scene.absolute_orientation(key).unwrap_or_default()),
        "relative_position": vec_value(scene.relative_position(key).unwrap_or_default()),
        "relative_orientation": quat_value(scene.relative_orientation(key).unwrap_or_default()),
        "position_timestamp": millis(sensor.node().position_timestamp),
        "orientation_timestamp": millis(sensor.node().orientation_timestamp),
        "collects_absolute_data": sensor.collects_absolute_data(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Views
// ────────────────────────────────────────────────────────────────────────────

/// Root joints with their child joints nested.  Sensors, `parent`, and the
/// defaults are omitted.
pub fn export_hierarchy(scene: &Scene) -> Value {
    export_custom(scene, Layout::Hierarchical, HIERARCHY_FIELDS)
}

/// Every joint at the top level.  `children` and the defaults are omitted.
pub fn export_list(scene: &Scene) -> Value {
    export_custom(scene, Layout::List, LIST_FIELDS)
}

/// Either layout, keeping only `fields`.
pub fn export_custom(scene: &Scene, layout: Layout, fields: &[Field]) -> Value {
    let joints: Vec<Value> = match layout {
        Layout::Hierarchical => scene
            .root_joints()
            .iter()
            .filter_map(|jt| scene.joint(*jt))
            .map(|j| joint_value(scene, j, fields, layout))
            .collect(),
        Layout::List => scene
            .joints()
            .map(|j| joint_value(scene, j, fields, layout))
            .collect(),
    };
    Value::Array(joints)
}

/// The joints named in `names`, in that order, keeping only `fields`.
///
/// # Errors
///
/// - [`EmbodyError::UnknownJointType`] when a name is not a joint type.
/// - [`EmbodyError::JointNotInModel`] when the model lacks that joint.
pub fn export_joints<S: AsRef<str>>(
    scene: &Scene,
    names: &[S],
    fields: &[Field],
) -> Result<Value, EmbodyError> {
    let mut joints = Vec::with_capacity(names.len());
    for name in names {
        let jt: JointType = name.as_ref().parse()?;
        let joint = scene.joint(jt).ok_or(EmbodyError::JointNotInModel(jt))?;
        joints.push(joint_value(scene, joint, fields, Layout::List));
    }
    Ok(Value::Array(joints))
}

/// The sensors placed in the scene, without their captured readings.
pub fn export_sensors(scene: &Scene) -> Value {
    Value::Array(scene.sensors().map(|s| sensor_value(scene, s)).collect())
}

/// An archived frame: `[joints, sensors]`.
pub fn export_elapsed(scene: &Scene) -> Value {
    json!([export_list(scene), export_sensors(scene)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use embody_hal::{FixedSensor, SensorSettings};
    use embody_types::{Arguments, SensorData};

    fn scene() -> Scene {
        let mut s = Scene::new();
        s.add_joint(
            JointType::SpineBase,
            Vec3::new(0.0, 20.0, 300.0),
            Quaternion::identity(),
            None,
        )
        .unwrap();
        s.add_joint(
            JointType::Head,
            Vec3::new(0.0, 25.123456, 0.0),
            Quaternion::identity(),
            Some(JointType::SpineBase),
        )
        .unwrap();
        s
    }

    #[test]
    fn numbers_are_truncated_to_four_decimals() {
        assert_eq!(trunc4(1.23456789), 1.2345);
        assert_eq!(trunc4(-1.23456789), -1.2345);
    }

    #[test]
    fn hierarchy_nests_children_and_omits_parent() {
        let v = export_hierarchy(&scene());
        let roots = v.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        let base = &roots[0];
        assert_eq!(base["joint_type"], "SPINE_BASE");
        assert!(base.get("parent").is_none());
        assert!(base.get("default_position").is_none());
        let head = &base["children"][0];
        assert_eq!(head["joint_type"], "HEAD");
        assert_eq!(head["relative_position"]["y"], 25.1234);
        assert_eq!(head["absolute_position"]["y"], 45.1234);
    }

    #[test]
    fn list_names_parent_and_omits_children() {
        let v = export_list(&scene());
        let joints = v.as_array().unwrap();
        assert_eq!(joints.len(), 2);
        let head = joints.iter().find(|j| j["joint_type"] == "HEAD").unwrap();
        assert_eq!(head["parent"], "SPINE_BASE");
        assert!(head.get("children").is_none());
        assert_eq!(head["position_timestamp"], 0);
    }

    #[test]
    fn custom_keeps_only_requested_fields() {
        let fields = [Field::JointType, Field::DefaultPosition];
        let v = export_custom(&scene(), Layout::List, &fields);
        let first = v[0].as_object().unwrap();
        assert_eq!(first.len(), 2);
        assert!(first.contains_key("default_position"));
    }

    #[test]
    fn joints_by_name() {
        let s = scene();
        let v = export_joints(&s, &["head"], &[Field::JointType]).unwrap();
        assert_eq!(v, json!([{ "joint_type": "HEAD" }]));

        let err = export_joints(&s, &["TAIL"], &[Field::JointType]).unwrap_err();
        assert!(matches!(err, EmbodyError::UnknownJointType(_)));

        let err = export_joints(&s, &["NECK"], &[Field::JointType]).unwrap_err();
        assert_eq!(err, EmbodyError::JointNotInModel(JointType::Neck));
    }

    #[test]
    fn sensors_and_elapsed_frame() {
        let mut s = scene();
        let settings = SensorSettings::from_args(Some("cam".into()), &Arguments::new()).unwrap();
        let sensor = Arc::new(FixedSensor::new(settings, SensorData::new()));
        s.add_sensor(
            sensor,
            Some(JointType::SpineBase),
            Vec3::new(1.0, 0.0, 0.0),
            Quaternion::identity(),
        )
        .unwrap();

        let v = export_sensors(&s);
        assert_eq!(v[0]["id"], "cam");
        assert_eq!(v[0]["parent"], "SPINE_BASE");
        assert_eq!(v[0]["absolute_position"]["x"], 1.0);
        assert!(v[0].get("current_data").is_none());

        let elapsed = export_elapsed(&s);
        assert_eq!(elapsed[0].as_array().unwrap().len(), 2);
        assert_eq!(elapsed[1].as_array().unwrap().len(), 1);
    }

    #[test]
    fn field_names_parse() {
        assert_eq!("parent".parse::<Field>().unwrap(), Field::Parent);
        assert!("colour".parse::<Field>().is_err());
        assert_eq!("list".parse::<Layout>().unwrap(), Layout::List);
    }
}
