//! Cluster members and membership events.

use std::collections::HashMap;

use hazelcast_core::protocol::codecs::{Address, MemberInfo, MemberVersion};
use uuid::Uuid;

/// Type of membership event fired when cluster topology changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MemberEventType {
    /// A new member joined the cluster.
    Added = 1,
    /// A member left the cluster.
    Removed = 2,
}

impl MemberEventType {
    /// Creates an event type from its wire format value.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Added),
            2 => Some(Self::Removed),
            _ => None,
        }
    }

    /// Returns the wire format value for this event type.
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for MemberEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Added => write!(f, "ADDED"),
            Self::Removed => write!(f, "REMOVED"),
        }
    }
}

/// Snapshot of one cluster member. Replaced wholesale, never mutated, when
/// the member list changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    uuid: Uuid,
    address: Address,
    lite_member: bool,
    attributes: HashMap<String, String>,
    version: MemberVersion,
}

impl Member {
    /// Creates a data member without attributes.
    pub fn new(uuid: Uuid, address: Address) -> Self {
        Self {
            uuid,
            address,
            lite_member: false,
            attributes: HashMap::new(),
            version: MemberVersion::default(),
        }
    }

    /// Marks the member as a lite member.
    pub fn with_lite_member(mut self, lite_member: bool) -> Self {
        self.lite_member = lite_member;
        self
    }

    /// Returns the member's UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Returns the member's network address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns whether this member holds no data.
    pub fn is_lite_member(&self) -> bool {
        self.lite_member
    }

    /// Returns the member's attributes.
    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Returns the member's codebase version.
    pub fn version(&self) -> MemberVersion {
        self.version
    }
}

impl From<MemberInfo> for Member {
    fn from(info: MemberInfo) -> Self {
        Self {
            uuid: info.uuid,
            address: info.address,
            lite_member: info.lite_member,
            attributes: info.attributes,
            version: info.version,
        }
    }
}

impl std::fmt::Display for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Member[uuid={}, address={}", self.uuid, self.address)?;
        if self.lite_member {
            write!(f, ", lite")?;
        }
        write!(f, "]")
    }
}

/// An event fired when a cluster member joins or leaves.
#[derive(Debug, Clone)]
pub struct MemberEvent {
    /// The member that triggered the event.
    pub member: Member,
    /// The type of membership change.
    pub event_type: MemberEventType,
}

impl MemberEvent {
    /// Creates a new membership event.
    pub fn new(member: Member, event_type: MemberEventType) -> Self {
        Self { member, event_type }
    }

    /// Creates an event for a member that joined the cluster.
    pub fn member_added(member: Member) -> Self {
        Self::new(member, MemberEventType::Added)
    }

    /// Creates an event for a member that left the cluster.
    pub fn member_removed(member: Member) -> Self {
        Self::new(member, MemberEventType::Removed)
    }
}

impl std::fmt::Display for MemberEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemberEvent[{} {}]", self.member, self.event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_event_type_values() {
        assert_eq!(MemberEventType::Added.value(), 1);
        assert_eq!(MemberEventType::Removed.value(), 2);
        assert_eq!(MemberEventType::from_value(1), Some(MemberEventType::Added));
        assert_eq!(MemberEventType::from_value(2), Some(MemberEventType::Removed));
        assert_eq!(MemberEventType::from_value(99), None);
    }

    #[test]
    fn test_member_from_info() {
        let uuid = Uuid::new_v4();
        let mut attributes = HashMap::new();
        attributes.insert("zone".to_string(), "eu-1".to_string());
        let member = Member::from(MemberInfo {
            uuid,
            address: Address::new("10.0.0.1", 5701),
            lite_member: true,
            attributes,
            version: MemberVersion {
                major: 5,
                minor: 3,
                patch: 0,
            },
        });

        assert_eq!(member.uuid(), uuid);
        assert_eq!(member.address().port, 5701);
        assert!(member.is_lite_member());
        assert_eq!(member.attributes().get("zone").map(String::as_str), Some("eu-1"));
        assert_eq!(member.version().major, 5);
    }

    #[test]
    fn test_member_display() {
        let uuid = Uuid::new_v4();
        let member = Member::new(uuid, Address::new("127.0.0.1", 5701));
        let display = member.to_string();
        assert!(display.contains(&uuid.to_string()));
        assert!(display.contains("127.0.0.1:5701"));
        assert!(!display.contains("lite"));
        assert!(member.with_lite_member(true).to_string().contains("lite"));
    }

    #[test]
    fn test_member_event_display() {
        let member = Member::new(Uuid::new_v4(), Address::new("127.0.0.1", 5701));
        let event = MemberEvent::member_removed(member);
        assert_eq!(event.event_type, MemberEventType::Removed);
        assert!(event.to_string().contains("REMOVED"));
    }
}
