use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::message::{Message, SenderProfile};

pub const CHAT: Uuid = Uuid::from_u128(0xc0);
pub const OTHER_CHAT: Uuid = Uuid::from_u128(0xc1);
pub const COACH: Uuid = Uuid::from_u128(0xa1);
pub const PLAYER: Uuid = Uuid::from_u128(0xa2);

/// Fixed instant offset by `secs` from 2026-03-01 09:00 UTC.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("fixture base time should be valid")
        + Duration::seconds(secs)
}

pub fn text_message(id: u128, sender: Uuid, content: &str, created_at: DateTime<Utc>) -> Message {
    Message::text(Uuid::from_u128(id), CHAT, sender, content, created_at)
}

pub fn profile(user_id: Uuid, name: &str) -> SenderProfile {
    SenderProfile {
        user_id,
        display_name: name.to_owned(),
        avatar_url: None,
    }
}
