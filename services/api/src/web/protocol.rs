//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol of the profile change feed.

use serde::{Deserialize, Serialize};

use crate::web::dto::{FinancialGoalsPayload, PersonalInfoPayload};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Reloads both records from storage and republishes them.
    Refresh,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================
// On connect the server sends the current value of every stream, then one
// message per change. Changes to one stream arrive in the order they were published.
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// `data` is `null` when nothing has been saved.
    PersonalInfo { data: Option<PersonalInfoPayload> },

    FinancialGoals { data: Option<FinancialGoalsPayload> },

    Completeness { value: u8 },

    /// Reports a failure to the client, which should display an error message.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_tagged_by_type() {
        let json = serde_json::to_value(ServerMessage::Completeness { value: 53 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "completeness", "value": 53 }));

        let json = serde_json::to_value(ServerMessage::PersonalInfo { data: None }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "personal_info", "data": null }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"refresh"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Refresh));
    }
}
