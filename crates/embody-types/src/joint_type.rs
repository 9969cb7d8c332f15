//! [`JointType`] – the stable identity of every joint in the body model.
//!
//! A `JointType` is the join key between sensors, fusers, filters, and the
//! scene history.  The textual form (`"SPINE_BASE"`, `"WRIST_LEFT"`, …) is
//! what configuration files, exports, and command arguments use.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::EmbodyError;

macro_rules! joint_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every joint the skeleton template knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum JointType {
            $(
                #[serde(rename = $name)]
                $variant,
            )+
        }

        impl JointType {
            /// All joint types in declaration order.
            pub const ALL: &'static [JointType] = &[$(JointType::$variant),+];

            /// The canonical upper-case name, e.g. `"SPINE_BASE"`.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(JointType::$variant => $name,)+
                }
            }
        }
    };
}

joint_types! {
    SpineBase => "SPINE_BASE",
    SpineMid => "SPINE_MID",
    SpineShoulder => "SPINE_SHOULDER",
    Neck => "NECK",
    Head => "HEAD",
    HipRight => "HIP_RIGHT",
    KneeRight => "KNEE_RIGHT",
    AnkleRight => "ANKLE_RIGHT",
    FootCenterRight => "FOOT_CENTER_RIGHT",
    HipLeft => "HIP_LEFT",
    KneeLeft => "KNEE_LEFT",
    AnkleLeft => "ANKLE_LEFT",
    FootCenterLeft => "FOOT_CENTER_LEFT",
    ShoulderRight => "SHOULDER_RIGHT",
    ElbowRight => "ELBOW_RIGHT",
    WristRight => "WRIST_RIGHT",
    HandCenterRight => "HAND_CENTER_RIGHT",
    ShoulderLeft => "SHOULDER_LEFT",
    ElbowLeft => "ELBOW_LEFT",
    WristLeft => "WRIST_LEFT",
    HandCenterLeft => "HAND_CENTER_LEFT",
    CmcSmallFingerRight => "CMC_SMALL_FINGER_RIGHT",
    McpSmallFingerRight => "MCP_SMALL_FINGER_RIGHT",
    PipSmallFingerRight => "PIP_SMALL_FINGER_RIGHT",
    DipSmallFingerRight => "DIP_SMALL_FINGER_RIGHT",
    BtipSmallFingerRight => "BTIP_SMALL_FINGER_RIGHT",
    CmcRingFingerRight => "CMC_RING_FINGER_RIGHT",
    McpRingFingerRight => "MCP_RING_FINGER_RIGHT",
    PipRingFingerRight => "PIP_RING_FINGER_RIGHT",
    DipRingFingerRight => "DIP_RING_FINGER_RIGHT",
    BtipRingFingerRight => "BTIP_RING_FINGER_RIGHT",
    CmcMiddleFingerRight => "CMC_MIDDLE_FINGER_RIGHT",
    McpMiddleFingerRight => "MCP_MIDDLE_FINGER_RIGHT",
    PipMiddleFingerRight => "PIP_MIDDLE_FINGER_RIGHT",
    DipMiddleFingerRight => "DIP_MIDDLE_FINGER_RIGHT",
    BtipMiddleFingerRight => "BTIP_MIDDLE_FINGER_RIGHT",
    CmcIndexFingerRight => "CMC_INDEX_FINGER_RIGHT",
    McpIndexFingerRight => "MCP_INDEX_FINGER_RIGHT",
    PipIndexFingerRight => "PIP_INDEX_FINGER_RIGHT",
    DipIndexFingerRight => "DIP_INDEX_FINGER_RIGHT",
    BtipIndexFingerRight => "BTIP_INDEX_FINGER_RIGHT",
    CmcThumbRight => "CMC_THUMB_RIGHT",
    McpThumbRight => "MCP_THUMB_RIGHT",
    IpThumbRight => "IP_THUMB_RIGHT",
    BtipThumbRight => "BTIP_THUMB_RIGHT",
    CmcSmallFingerLeft => "CMC_SMALL_FINGER_LEFT",
    McpSmallFingerLeft => "MCP_SMALL_FINGER_LEFT",
    PipSmallFingerLeft => "PIP_SMALL_FINGER_LEFT",
    DipSmallFingerLeft => "DIP_SMALL_FINGER_LEFT",
    BtipSmallFingerLeft => "BTIP_SMALL_FINGER_LEFT",
    CmcRingFingerLeft => "CMC_RING_FINGER_LEFT",
    McpRingFingerLeft => "MCP_RING_FINGER_LEFT",
    PipRingFingerLeft => "PIP_RING_FINGER_LEFT",
    DipRingFingerLeft => "DIP_RING_FINGER_LEFT",
    BtipRingFingerLeft => "BTIP_RING_FINGER_LEFT",
    CmcMiddleFingerLeft => "CMC_MIDDLE_FINGER_LEFT",
    McpMiddleFingerLeft => "MCP_MIDDLE_FINGER_LEFT",
    PipMiddleFingerLeft => "PIP_MIDDLE_FINGER_LEFT",
    DipMiddleFingerLeft => "DIP_MIDDLE_FINGER_LEFT",
    BtipMiddleFingerLeft => "BTIP_MIDDLE_FINGER_LEFT",
    CmcIndexFingerLeft => "CMC_INDEX_FINGER_LEFT",
    McpIndexFingerLeft => "MCP_INDEX_FINGER_LEFT",
    PipIndexFingerLeft => "PIP_INDEX_FINGER_LEFT",
    DipIndexFingerLeft => "DIP_INDEX_FINGER_LEFT",
    BtipIndexFingerLeft => "BTIP_INDEX_FINGER_LEFT",
    CmcThumbLeft => "CMC_THUMB_LEFT",
    McpThumbLeft => "MCP_THUMB_LEFT",
    IpThumbLeft => "IP_THUMB_LEFT",
    BtipThumbLeft => "BTIP_THUMB_LEFT",
    HeelBoneRight => "HEEL_BONE_RIGHT",
    TmtSmallToeRight => "TMT_SMALL_TOE_RIGHT",
    McpSmallToeRight => "MCP_SMALL_TOE_RIGHT",
    PipSmallToeRight => "PIP_SMALL_TOE_RIGHT",
    DipSmallToeRight => "DIP_SMALL_TOE_RIGHT",
    BtipSmallToeRight => "BTIP_SMALL_TOE_RIGHT",
    TmtRingToeRight => "TMT_RING_TOE_RIGHT",
    McpRingToeRight => "MCP_RING_TOE_RIGHT",
    PipRingToeRight => "PIP_RING_TOE_RIGHT",
    DipRingToeRight => "DIP_RING_TOE_RIGHT",
    BtipRingToeRight => "BTIP_RING_TOE_RIGHT",
    TmtMiddleToeRight => "TMT_MIDDLE_TOE_RIGHT",
    McpMiddleToeRight => "MCP_MIDDLE_TOE_RIGHT",
    PipMiddleToeRight => "PIP_MIDDLE_TOE_RIGHT",
    DipMiddleToeRight => "DIP_MIDDLE_TOE_RIGHT",
    BtipMiddleToeRight => "BTIP_MIDDLE_TOE_RIGHT",
    TmtLongToeRight => "TMT_LONG_TOE_RIGHT",
    McpLongToeRight => "MCP_LONG_TOE_RIGHT",
    PipLongToeRight => "PIP_LONG_TOE_RIGHT",
    DipLongToeRight => "DIP_LONG_TOE_RIGHT",
    BtipLongToeRight => "BTIP_LONG_TOE_RIGHT",
    TmtBigToeRight => "TMT_BIG_TOE_RIGHT",
    MtpBigToeRight => "MTP_BIG_TOE_RIGHT",
    IpBigToeRight => "IP_BIG_TOE_RIGHT",
    BtipBigToeRight => "BTIP_BIG_TOE_RIGHT",
    HeelBoneLeft => "HEEL_BONE_LEFT",
    TmtSmallToeLeft => "TMT_SMALL_TOE_LEFT",
    McpSmallToeLeft => "MCP_SMALL_TOE_LEFT",
    PipSmallToeLeft => "PIP_SMALL_TOE_LEFT",
    DipSmallToeLeft => "DIP_SMALL_TOE_LEFT",
    BtipSmallToeLeft => "BTIP_SMALL_TOE_LEFT",
    TmtRingToeLeft => "TMT_RING_TOE_LEFT",
    McpRingToeLeft => "MCP_RING_TOE_LEFT",
    PipRingToeLeft => "PIP_RING_TOE_LEFT",
    DipRingToeLeft => "DIP_RING_TOE_LEFT",
    BtipRingToeLeft => "BTIP_RING_TOE_LEFT",
    TmtMiddleToeLeft => "TMT_MIDDLE_TOE_LEFT",
    McpMiddleToeLeft => "MCP_MIDDLE_TOE_LEFT",
    PipMiddleToeLeft => "PIP_MIDDLE_TOE_LEFT",
    DipMiddleToeLeft => "DIP_MIDDLE_TOE_LEFT",
    BtipMiddleToeLeft => "BTIP_MIDDLE_TOE_LEFT",
    TmtLongToeLeft => "TMT_LONG_TOE_LEFT",
    McpLongToeLeft => "MCP_LONG_TOE_LEFT",
    PipLongToeLeft => "PIP_LONG_TOE_LEFT",
    DipLongToeLeft => "DIP_LONG_TOE_LEFT",
    BtipLongToeLeft => "BTIP_LONG_TOE_LEFT",
    TmtBigToeLeft => "TMT_BIG_TOE_LEFT",
    MtpBigToeLeft => "MTP_BIG_TOE_LEFT",
    IpBigToeLeft => "IP_BIG_TOE_LEFT",
    BtipBigToeLeft => "BTIP_BIG_TOE_LEFT",
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JointType {
    type Err = EmbodyError;

    /// Parse a joint name.  Matching is case-insensitive and surrounding
    /// whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        JointType::ALL
            .iter()
            .copied()
            .find(|jt| jt.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EmbodyError::UnknownJointType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("spine_base".parse::<JointType>().unwrap(), JointType::SpineBase);
        assert_eq!(" WRIST_LEFT ".parse::<JointType>().unwrap(), JointType::WristLeft);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = "TAIL".parse::<JointType>().unwrap_err();
        assert!(matches!(err, EmbodyError::UnknownJointType(ref n) if n == "TAIL"));
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = JointType::ALL.iter().map(|jt| jt.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), JointType::ALL.len());
    }

    #[test]
    fn serde_uses_canonical_name() {
        let json = serde_json::to_string(&JointType::BtipThumbRight).unwrap();
        assert_eq!(json, "\"BTIP_THUMB_RIGHT\"");
        let back: JointType = serde_json::from_str("\"HEEL_BONE_LEFT\"").unwrap();
        assert_eq!(back, JointType::HeelBoneLeft);
    }
}
