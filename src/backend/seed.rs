//! Demo roster for the local backend, plus a teammate that keeps posting.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{runtime::Handle, sync::watch};
use uuid::Uuid;

use crate::domain::{
    chat::{Chat, ChatKind, ParticipantRole},
    message::{Message, Reaction, SenderProfile},
};

use super::{local::LocalBackend, GatewayError};

pub const JORDAN: Uuid = Uuid::from_u128(0x7e57_0000_0000_0000_0000_0000_0000_0002);
pub const AVERY: Uuid = Uuid::from_u128(0x7e57_0000_0000_0000_0000_0000_0000_0003);
pub const SAM: Uuid = Uuid::from_u128(0x7e57_0000_0000_0000_0000_0000_0000_0004);
pub const VARSITY_TEAM: Uuid = Uuid::from_u128(0x7ea0_0000_0000_0000_0000_0000_0000_0001);
pub const VARSITY_CHAT: Uuid = Uuid::from_u128(0xc4a7_0000_0000_0000_0000_0000_0000_0001);
pub const STAFF_CHAT: Uuid = Uuid::from_u128(0xc4a7_0000_0000_0000_0000_0000_0000_0002);
pub const JORDAN_CHAT: Uuid = Uuid::from_u128(0xc4a7_0000_0000_0000_0000_0000_0000_0003);

const VARSITY_HISTORY_LEN: usize = 120;

const TEAM_LINES: [&str; 12] = [
    "Practice moved to the north gym today",
    "Who's driving to the away game Saturday?",
    "I can take three people",
    "Reminder: jerseys go in the laundry bin after practice",
    "Film session at 6, bring notebooks",
    "Great hustle on defense last night",
    "Anyone seen my left shoe lol",
    "Bus leaves at 7:15 sharp",
    "Free throws after warmup, 20 each",
    "Parents asked about the tournament schedule",
    "Ice baths are open until 8",
    "Let's go team!",
];

const CHATTER_LINES: [&str; 6] = [
    "On my way to the gym",
    "Coach, can we run the zone drill again?",
    "Stretching now",
    "Who has the extra pinnies?",
    "Scrimmage tonight?",
    "Nice work today everyone",
];

const CHATTER_STARTED: &str = "DEMO_CHATTER_STARTED";
const CHATTER_POST_FAILED: &str = "DEMO_CHATTER_POST_FAILED";

/// Populates the backend with a team, a staff group and a private chat.
pub fn seed_demo(backend: &LocalBackend, user: &SenderProfile) -> Result<(), GatewayError> {
    let now = Utc::now();
    let me = user.user_id;

    backend.put_profile(user.clone())?;
    for (user_id, name) in [
        (JORDAN, "Jordan Miles"),
        (AVERY, "Avery Chen"),
        (SAM, "Sam Ortiz"),
    ] {
        backend.put_profile(SenderProfile {
            user_id,
            display_name: name.to_owned(),
            avatar_url: None,
        })?;
    }

    let history_start = now - chrono::Duration::minutes(7 * VARSITY_HISTORY_LEN as i64);
    backend.put_chat(
        chat(VARSITY_CHAT, "Varsity Basketball", ChatKind::Team, me, Some(VARSITY_TEAM), history_start),
        &[
            (me, ParticipantRole::Admin),
            (JORDAN, ParticipantRole::Member),
            (AVERY, ParticipantRole::Member),
            (SAM, ParticipantRole::Member),
        ],
    )?;
    let roster = [me, JORDAN, AVERY, SAM];
    for n in 0..VARSITY_HISTORY_LEN {
        let sender = roster[n % roster.len()];
        let created_at = history_start + chrono::Duration::minutes(7 * n as i64);
        let mut row = Message::text(
            Uuid::new_v4(),
            VARSITY_CHAT,
            sender,
            TEAM_LINES[n % TEAM_LINES.len()],
            created_at,
        );
        if n % 9 == 0 {
            row.reactions.push(reaction(row.id, roster[(n + 1) % roster.len()], "🔥", created_at));
        }
        backend.put_message(row)?;
    }

    let staff_start = now - chrono::Duration::hours(5);
    backend.put_chat(
        chat(STAFF_CHAT, "Coaching Staff", ChatKind::Group, AVERY, None, staff_start),
        &[(AVERY, ParticipantRole::Admin), (me, ParticipantRole::Member)],
    )?;
    for (offset, sender, text) in [
        (0, AVERY, "Lineup for Friday?"),
        (12, me, "Same starters, Sam off the bench"),
        (15, AVERY, "Works for me"),
    ] {
        backend.put_message(Message::text(
            Uuid::new_v4(),
            STAFF_CHAT,
            sender,
            text,
            staff_start + chrono::Duration::minutes(offset),
        ))?;
    }

    let private_start = now - chrono::Duration::days(1);
    backend.put_chat(
        chat(JORDAN_CHAT, "", ChatKind::Private, JORDAN, None, private_start),
        &[(JORDAN, ParticipantRole::Admin), (me, ParticipantRole::Member)],
    )?;
    backend.put_message(Message::text(
        Uuid::new_v4(),
        JORDAN_CHAT,
        JORDAN,
        "Coach, I'll be 10 min late tomorrow",
        private_start,
    ))?;

    tracing::info!(chats = 3, messages = VARSITY_HISTORY_LEN + 4, "demo data seeded");
    Ok(())
}

fn chat(
    id: Uuid,
    name: &str,
    kind: ChatKind,
    created_by: Uuid,
    team_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
) -> Chat {
    Chat {
        id,
        name: name.to_owned(),
        kind,
        created_by,
        team_id,
        is_archived: false,
        updated_at,
    }
}

fn reaction(message_id: Uuid, user_id: Uuid, emoji: &str, created_at: DateTime<Utc>) -> Reaction {
    Reaction {
        id: Uuid::new_v4(),
        message_id,
        user_id,
        emoji: emoji.to_owned(),
        created_at,
    }
}

/// Teammate posting into the team chat on a fixed interval until dropped.
#[derive(Debug)]
pub struct DemoChatter {
    stop_tx: Option<watch::Sender<bool>>,
}

impl DemoChatter {
    pub fn start(runtime: &Handle, backend: Arc<LocalBackend>, every: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            let mut line = 0usize;
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            return;
                        }
                    }
                    _ = ticker.tick() => {
                        let text = CHATTER_LINES[line % CHATTER_LINES.len()];
                        line += 1;
                        if let Err(error) = backend.post_as(JORDAN, VARSITY_CHAT, text) {
                            tracing::warn!(code = CHATTER_POST_FAILED, error = %error, "demo teammate could not post");
                        }
                    }
                }
            }
        });

        tracing::info!(code = CHATTER_STARTED, every_secs = every.as_secs(), "demo teammate started");
        Self {
            stop_tx: Some(stop_tx),
        }
    }
}

impl Drop for DemoChatter {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::ChangeFeed,
        usecases::{list_chats::ChatsSource, load_messages::MessagesSource},
        test_support::{profile, COACH},
    };

    fn seeded() -> LocalBackend {
        let backend = LocalBackend::new(COACH, Duration::ZERO);
        seed_demo(&backend, &profile(COACH, "Coach Carter")).expect("seed");
        backend
    }

    #[test]
    fn seeds_three_chats_for_the_user() {
        let backend = seeded();

        let chats = backend.list_chats(COACH, 50, 0).expect("list");

        assert_eq!(chats.len(), 3);
        assert!(chats.iter().any(|c| c.title() == "Jordan Miles"));
    }

    #[test]
    fn team_chat_pages_as_50_50_20() {
        let backend = seeded();

        let sizes: Vec<usize> = (0..3)
            .map(|page| {
                backend
                    .list_messages(VARSITY_CHAT, page * 50, 50)
                    .expect("page")
                    .len()
            })
            .collect();

        assert_eq!(sizes, vec![50, 50, 20]);
    }

    #[test]
    fn chatter_posts_into_team_chat() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let backend = Arc::new(seeded());
        let mut feed = backend.subscribe();

        let chatter = DemoChatter::start(runtime.handle(), Arc::clone(&backend), Duration::from_millis(20));
        let envelope = runtime
            .block_on(async { tokio::time::timeout(Duration::from_secs(2), feed.recv()).await })
            .expect("chatter should post in time")
            .expect("feed open");
        drop(chatter);

        assert_eq!(envelope.chat_id, VARSITY_CHAT);
    }
}
