//! Display identity of a conversation as seen by one participant

use bizhub_store::{ConversationRow, Participant};

const FALLBACK_NAME: &str = "User";

/// Who a conversation is "with", from the viewer's side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayIdentity {
    pub display_name: String,
    pub initial: String,
    pub other_user_id: String,
}

/// Resolve the display name, avatar initial and counterpart of `row` for
/// `current_user`.
///
/// With a business attached, the owner sees the customer's name and
/// everyone else sees the business name. Without one, the other
/// participant's name is shown. A missing or empty name falls back to
/// `"User"`.
pub fn resolve_display(row: &ConversationRow, current_user: &str) -> DisplayIdentity {
    let other = other_participant(row, current_user);

    let display_name = match &row.business {
        Some(business) if business.owner_id != current_user => business.name.clone(),
        _ => participant_name(other),
    };

    DisplayIdentity {
        initial: initial_of(&display_name),
        display_name,
        other_user_id: other.id.clone(),
    }
}

/// First character uppercased, `"?"` for an empty name
pub fn initial_of(name: &str) -> String {
    match name.chars().next() {
        Some(c) => c.to_uppercase().collect(),
        None => "?".to_string(),
    }
}

fn other_participant<'a>(row: &'a ConversationRow, current_user: &str) -> &'a Participant {
    if row.record.participant1_id == current_user {
        &row.participant2
    } else {
        &row.participant1
    }
}

fn participant_name(participant: &Participant) -> String {
    match participant.name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => FALLBACK_NAME.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizhub_store::{BusinessRef, ConversationRecord};
    use chrono::Utc;

    fn row(p1: (&str, Option<&str>), p2: (&str, Option<&str>), business: Option<BusinessRef>) -> ConversationRow {
        let now = Utc::now();
        ConversationRow {
            record: ConversationRecord {
                id: "c1".to_string(),
                participant1_id: p1.0.to_string(),
                participant2_id: p2.0.to_string(),
                business_id: business.as_ref().map(|b| b.id.clone()),
                last_message_at: now,
                created_at: now,
            },
            participant1: Participant {
                id: p1.0.to_string(),
                name: p1.1.map(str::to_string),
            },
            participant2: Participant {
                id: p2.0.to_string(),
                name: p2.1.map(str::to_string),
            },
            business,
        }
    }

    fn cafe() -> BusinessRef {
        BusinessRef {
            id: "biz-1".to_string(),
            name: "Joe's Cafe".to_string(),
            owner_id: "owner".to_string(),
        }
    }

    #[test]
    fn test_owner_sees_customer_name() {
        let r = row(("cust", Some("carl")), ("owner", Some("Olivia")), Some(cafe()));
        let id = resolve_display(&r, "owner");
        assert_eq!(id.display_name, "carl");
        assert_eq!(id.initial, "C");
        assert_eq!(id.other_user_id, "cust");
    }

    #[test]
    fn test_customer_sees_business_name() {
        let r = row(("cust", Some("Carl")), ("owner", Some("Olivia")), Some(cafe()));
        let id = resolve_display(&r, "cust");
        assert_eq!(id.display_name, "Joe's Cafe");
        assert_eq!(id.initial, "J");
        assert_eq!(id.other_user_id, "owner");
    }

    #[test]
    fn test_direct_chat_uses_other_name_in_either_order() {
        let r = row(("a", Some("Alice")), ("b", Some("Bob")), None);
        assert_eq!(resolve_display(&r, "a").display_name, "Bob");
        assert_eq!(resolve_display(&r, "b").display_name, "Alice");
    }

    #[test]
    fn test_missing_name_falls_back() {
        let r = row(("a", Some("Alice")), ("b", None), None);
        let id = resolve_display(&r, "a");
        assert_eq!(id.display_name, "User");
        assert_eq!(id.initial, "U");

        let owner_view = row(("cust", Some("")), ("owner", Some("Olivia")), Some(cafe()));
        assert_eq!(resolve_display(&owner_view, "owner").display_name, "User");
    }

    #[test]
    fn test_initial_of_empty_and_unicode() {
        assert_eq!(initial_of(""), "?");
        assert_eq!(initial_of("émile"), "É");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let r = row(("cust", Some("Carl")), ("owner", Some("Olivia")), Some(cafe()));
        assert_eq!(resolve_display(&r, "cust"), resolve_display(&r, "cust"));
    }
}
