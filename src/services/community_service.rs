//! Community Service - events, chat rooms and messages

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::models::{
    EventType, MessageType, RoomType, chat_room, community_event, event_participant, message,
    room_member,
};

use super::level_service;

pub const MAX_MESSAGE_LEN: usize = 1000;
pub const DEFAULT_MESSAGE_PAGE: u64 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_type: EventType,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: Option<i32>,
    #[serde(default = "default_true")]
    pub is_online: bool,
    pub meeting_url: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub price_points: i64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: community_event::Model,
    pub participants_count: u64,
    pub is_joined: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub room_type: RoomType,
    pub event_id: Option<i32>,
    pub max_members: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomView {
    #[serde(flatten)]
    pub room: chat_room::Model,
    pub member_count: u64,
    pub is_member: bool,
    pub last_message: Option<message::Model>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageInput {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub replied_to_id: Option<i32>,
}

pub fn validate_event(input: &CreateEventInput) -> Result<(), DomainError> {
    if input.title.trim().is_empty() {
        return Err(DomainError::validation("title is required"));
    }
    if input.end_time <= input.start_time {
        return Err(DomainError::validation("end_time must be after start_time"));
    }
    if input.max_participants.is_some_and(|n| n < 1) {
        return Err(DomainError::validation("max_participants must be at least 1"));
    }
    if input.price_points < 0 {
        return Err(DomainError::validation("price_points cannot be negative"));
    }
    Ok(())
}

pub fn validate_message(content: &str) -> Result<(), DomainError> {
    let len = content.trim().chars().count();
    if len == 0 {
        return Err(DomainError::validation("message cannot be empty"));
    }
    if len > MAX_MESSAGE_LEN {
        return Err(DomainError::validation(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(())
}

// ── Events ──────────────────────────────────────────────────

pub async fn list_events(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<EventView>, DomainError> {
    let events = community_event::Entity::find()
        .filter(community_event::Column::IsActive.eq(true))
        .order_by_asc(community_event::Column::StartTime)
        .all(db)
        .await?;

    let ids: Vec<i32> = events.iter().map(|e| e.id).collect();
    let participants = if ids.is_empty() {
        Vec::new()
    } else {
        event_participant::Entity::find()
            .filter(event_participant::Column::EventId.is_in(ids))
            .all(db)
            .await?
    };

    let mut counts: HashMap<i32, u64> = HashMap::new();
    let mut joined: HashSet<i32> = HashSet::new();
    for p in &participants {
        *counts.entry(p.event_id).or_default() += 1;
        if p.user_id == user_id {
            joined.insert(p.event_id);
        }
    }

    Ok(events
        .into_iter()
        .map(|event| EventView {
            participants_count: counts.get(&event.id).copied().unwrap_or(0),
            is_joined: joined.contains(&event.id),
            event,
        })
        .collect())
}

pub async fn create_event(
    db: &DatabaseConnection,
    host_id: i32,
    input: CreateEventInput,
) -> Result<community_event::Model, DomainError> {
    validate_event(&input)?;

    let event = community_event::ActiveModel {
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        event_type: Set(input.event_type),
        host_id: Set(host_id),
        start_time: Set(input.start_time),
        end_time: Set(input.end_time),
        max_participants: Set(input.max_participants),
        is_online: Set(input.is_online),
        meeting_url: Set(input.meeting_url),
        location: Set(input.location),
        price_points: Set(input.price_points),
        is_active: Set(true),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!("User {} created event {} '{}'", host_id, event.id, event.title);
    Ok(event)
}

/// Register for an event, paying its price from the point balance.
pub async fn join_event(
    db: &DatabaseConnection,
    user_id: i32,
    event_id: i32,
) -> Result<event_participant::Model, DomainError> {
    let txn = db.begin().await?;

    let event = community_event::Entity::find_by_id(event_id)
        .filter(community_event::Column::IsActive.eq(true))
        .one(&txn)
        .await?
        .ok_or(DomainError::NotFound)?;

    let already = event_participant::Entity::find()
        .filter(event_participant::Column::EventId.eq(event_id))
        .filter(event_participant::Column::UserId.eq(user_id))
        .one(&txn)
        .await?;
    if already.is_some() {
        return Err(DomainError::validation("already registered"));
    }

    if let Some(max) = event.max_participants {
        let count = event_participant::Entity::find()
            .filter(event_participant::Column::EventId.eq(event_id))
            .count(&txn)
            .await?;
        if count >= max as u64 {
            return Err(DomainError::validation("event is full"));
        }
    }

    if event.price_points > 0 {
        level_service::debit(&txn, user_id, event.price_points).await?;
    }

    let participant = event_participant::ActiveModel {
        event_id: Set(event_id),
        user_id: Set(user_id),
        joined_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        "User {} joined event {} ({} points)",
        user_id,
        event_id,
        event.price_points
    );
    Ok(participant)
}

/// Leave an event. Paid points are not refunded.
pub async fn leave_event(
    db: &DatabaseConnection,
    user_id: i32,
    event_id: i32,
) -> Result<(), DomainError> {
    let result = event_participant::Entity::delete_many()
        .filter(event_participant::Column::EventId.eq(event_id))
        .filter(event_participant::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DomainError::NotFound);
    }
    Ok(())
}

// ── Rooms ───────────────────────────────────────────────────

async fn is_member<C: ConnectionTrait>(
    conn: &C,
    room_id: i32,
    user_id: i32,
) -> Result<bool, DomainError> {
    Ok(room_member::Entity::find()
        .filter(room_member::Column::RoomId.eq(room_id))
        .filter(room_member::Column::UserId.eq(user_id))
        .one(conn)
        .await?
        .is_some())
}

async fn find_room<C: ConnectionTrait>(conn: &C, room_id: i32) -> Result<chat_room::Model, DomainError> {
    chat_room::Entity::find_by_id(room_id)
        .filter(chat_room::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or(DomainError::NotFound)
}

/// Public rooms plus any room the user belongs to.
pub async fn list_rooms(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<RoomView>, DomainError> {
    let rooms = chat_room::Entity::find()
        .filter(chat_room::Column::IsActive.eq(true))
        .order_by_asc(chat_room::Column::Id)
        .all(db)
        .await?;

    let ids: Vec<i32> = rooms.iter().map(|r| r.id).collect();
    let members = if ids.is_empty() {
        Vec::new()
    } else {
        room_member::Entity::find()
            .filter(room_member::Column::RoomId.is_in(ids))
            .all(db)
            .await?
    };

    let mut counts: HashMap<i32, u64> = HashMap::new();
    let mut mine: HashSet<i32> = HashSet::new();
    for m in &members {
        *counts.entry(m.room_id).or_default() += 1;
        if m.user_id == user_id {
            mine.insert(m.room_id);
        }
    }

    let mut views = Vec::new();
    for room in rooms {
        let is_member = mine.contains(&room.id);
        if room.room_type != RoomType::Public && !is_member {
            continue;
        }

        let last_message = message::Entity::find()
            .filter(message::Column::RoomId.eq(room.id))
            .order_by_desc(message::Column::Id)
            .one(db)
            .await?;

        views.push(RoomView {
            member_count: counts.get(&room.id).copied().unwrap_or(0),
            is_member,
            last_message,
            room,
        });
    }
    Ok(views)
}

pub async fn create_room(
    db: &DatabaseConnection,
    user_id: i32,
    input: CreateRoomInput,
) -> Result<chat_room::Model, DomainError> {
    let name = input.name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(DomainError::validation("name must be 1 to 100 characters"));
    }
    if input.max_members.is_some_and(|n| n < 1) {
        return Err(DomainError::validation("max_members must be at least 1"));
    }
    if input.room_type == RoomType::Event && input.event_id.is_none() {
        return Err(DomainError::validation("event rooms need an event_id"));
    }

    let txn = db.begin().await?;

    if let Some(event_id) = input.event_id {
        community_event::Entity::find_by_id(event_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DomainError::validation("event does not exist"))?;
    }

    let now = Utc::now().to_rfc3339();
    let room = chat_room::ActiveModel {
        name: Set(name.to_string()),
        description: Set(input.description),
        room_type: Set(input.room_type),
        event_id: Set(input.event_id),
        max_members: Set(input.max_members),
        is_active: Set(true),
        created_by: Set(user_id),
        created_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    room_member::ActiveModel {
        room_id: Set(room.id),
        user_id: Set(user_id),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    tracing::info!("User {} created room {} '{}'", user_id, room.id, room.name);
    Ok(room)
}

async fn add_member<C: ConnectionTrait>(
    conn: &C,
    room: &chat_room::Model,
    user_id: i32,
) -> Result<(), DomainError> {
    if is_member(conn, room.id, user_id).await? {
        return Ok(());
    }

    if let Some(max) = room.max_members {
        let count = room_member::Entity::find()
            .filter(room_member::Column::RoomId.eq(room.id))
            .count(conn)
            .await?;
        if count >= max as u64 {
            return Err(DomainError::validation("room is full"));
        }
    }

    room_member::ActiveModel {
        room_id: Set(room.id),
        user_id: Set(user_id),
        joined_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Join a room. Joining twice is a no-op. Private rooms cannot be joined
/// directly; event rooms are open to the event's participants.
pub async fn join_room(
    db: &DatabaseConnection,
    user_id: i32,
    room_id: i32,
) -> Result<(), DomainError> {
    let txn = db.begin().await?;
    let room = find_room(&txn, room_id).await?;

    match room.room_type {
        RoomType::Public => {}
        RoomType::Private => {
            if !is_member(&txn, room_id, user_id).await? {
                return Err(DomainError::validation("room is private"));
            }
        }
        RoomType::Event => {
            let registered = match room.event_id {
                Some(event_id) => event_participant::Entity::find()
                    .filter(event_participant::Column::EventId.eq(event_id))
                    .filter(event_participant::Column::UserId.eq(user_id))
                    .one(&txn)
                    .await?
                    .is_some(),
                None => false,
            };
            if !registered && room.created_by != user_id {
                return Err(DomainError::validation("join the event first"));
            }
        }
    }

    add_member(&txn, &room, user_id).await?;
    txn.commit().await?;
    Ok(())
}

/// Most recent messages, returned oldest first.
pub async fn list_messages(
    db: &DatabaseConnection,
    user_id: i32,
    room_id: i32,
    limit: Option<u64>,
) -> Result<Vec<message::Model>, DomainError> {
    let room = find_room(db, room_id).await?;
    if room.room_type != RoomType::Public && !is_member(db, room_id, user_id).await? {
        return Err(DomainError::NotFound);
    }

    let limit = limit.unwrap_or(DEFAULT_MESSAGE_PAGE).clamp(1, 200);
    let mut messages = message::Entity::find()
        .filter(message::Column::RoomId.eq(room_id))
        .order_by_desc(message::Column::Id)
        .limit(limit)
        .all(db)
        .await?;
    messages.reverse();
    Ok(messages)
}

pub async fn send_message(
    db: &DatabaseConnection,
    user_id: i32,
    room_id: i32,
    input: SendMessageInput,
) -> Result<message::Model, DomainError> {
    validate_message(&input.content)?;

    let txn = db.begin().await?;
    let room = find_room(&txn, room_id).await?;

    if room.room_type == RoomType::Public {
        add_member(&txn, &room, user_id).await?;
    } else if !is_member(&txn, room_id, user_id).await? {
        return Err(DomainError::NotFound);
    }

    if let Some(reply_to) = input.replied_to_id {
        let parent = message::Entity::find_by_id(reply_to).one(&txn).await?;
        if parent.is_none_or(|m| m.room_id != room_id) {
            return Err(DomainError::validation("replied_to_id is not in this room"));
        }
    }

    let sent = message::ActiveModel {
        room_id: Set(room_id),
        user_id: Set(user_id),
        content: Set(input.content.trim().to_string()),
        message_type: Set(input.message_type),
        replied_to_id: Set(input.replied_to_id),
        is_edited: Set(false),
        created_at: Set(Utc::now().to_rfc3339()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(start: DateTime<Utc>, end: DateTime<Utc>) -> CreateEventInput {
        CreateEventInput {
            title: "Sunday run".into(),
            description: String::new(),
            event_type: EventType::Meetup,
            start_time: start,
            end_time: end,
            max_participants: None,
            is_online: false,
            meeting_url: None,
            location: Some("Park".into()),
            price_points: 0,
        }
    }

    #[test]
    fn event_must_end_after_start() {
        let now = Utc::now();
        assert!(validate_event(&event(now, now + Duration::hours(1))).is_ok());
        assert!(validate_event(&event(now, now)).is_err());
        assert!(validate_event(&event(now, now - Duration::hours(1))).is_err());
    }

    #[test]
    fn event_title_required() {
        let now = Utc::now();
        let mut input = event(now, now + Duration::hours(1));
        input.title = "  ".into();
        assert!(validate_event(&input).is_err());
    }

    #[test]
    fn message_length_bounds() {
        assert!(validate_message("hi").is_ok());
        assert!(validate_message("   ").is_err());
        assert!(validate_message(&"a".repeat(1000)).is_ok());
        assert!(validate_message(&"a".repeat(1001)).is_err());
    }
}
