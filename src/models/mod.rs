pub mod achievement;
pub mod chat_room;
pub mod community_event;
pub mod contact_message;
pub mod enums;
pub mod event_participant;
pub mod habit;
pub mod habit_entry;
pub mod key_value;
pub mod message;
pub mod room_member;
pub mod shop_item;
pub mod user;
pub mod user_achievement;
pub mod user_level;
pub mod user_purchase;

pub use enums::{EventType, Frequency, MessageType, Rarity, RequirementType, RoomType, ShopCategory};
