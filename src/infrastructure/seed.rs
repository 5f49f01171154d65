use chrono::{Duration, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use crate::infrastructure::auth::hash_password;
use crate::models::{
    EventType, Rarity, RequirementType, RoomType, ShopCategory, achievement, chat_room,
    community_event, habit, habit_entry, shop_item, user,
};

struct AchievementSeed {
    code: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    points_reward: i64,
    requirement_type: RequirementType,
    requirement_value: i64,
    rarity: Rarity,
}

const ACHIEVEMENTS: &[AchievementSeed] = &[
    AchievementSeed {
        code: "first_habit",
        name: "First Step",
        description: "Create your first habit",
        icon: "🌱",
        points_reward: 10,
        requirement_type: RequirementType::HabitsCreated,
        requirement_value: 1,
        rarity: Rarity::Common,
    },
    AchievementSeed {
        code: "habit_collector",
        name: "Habit Collector",
        description: "Create 10 habits",
        icon: "🗂️",
        points_reward: 50,
        requirement_type: RequirementType::HabitsCreated,
        requirement_value: 10,
        rarity: Rarity::Rare,
    },
    AchievementSeed {
        code: "first_completion",
        name: "Getting Started",
        description: "Complete a habit for the first time",
        icon: "✅",
        points_reward: 10,
        requirement_type: RequirementType::Completions,
        requirement_value: 1,
        rarity: Rarity::Common,
    },
    AchievementSeed {
        code: "completions_100",
        name: "Centurion",
        description: "Complete habits 100 times",
        icon: "💯",
        points_reward: 200,
        requirement_type: RequirementType::Completions,
        requirement_value: 100,
        rarity: Rarity::Epic,
    },
    AchievementSeed {
        code: "streak_3",
        name: "On a Roll",
        description: "Keep a 3 day streak",
        icon: "🔥",
        points_reward: 20,
        requirement_type: RequirementType::Streak,
        requirement_value: 3,
        rarity: Rarity::Common,
    },
    AchievementSeed {
        code: "streak_7",
        name: "Week Warrior",
        description: "Keep a 7 day streak",
        icon: "⚡",
        points_reward: 50,
        requirement_type: RequirementType::Streak,
        requirement_value: 7,
        rarity: Rarity::Rare,
    },
    AchievementSeed {
        code: "streak_30",
        name: "Unstoppable",
        description: "Keep a 30 day streak",
        icon: "🏆",
        points_reward: 300,
        requirement_type: RequirementType::Streak,
        requirement_value: 30,
        rarity: Rarity::Legendary,
    },
    AchievementSeed {
        code: "level_5",
        name: "Rising Star",
        description: "Reach level 5",
        icon: "⭐",
        points_reward: 100,
        requirement_type: RequirementType::Level,
        requirement_value: 5,
        rarity: Rarity::Epic,
    },
];

struct ShopSeed {
    name: &'static str,
    description: &'static str,
    category: ShopCategory,
    price_points: i64,
    icon: &'static str,
    rarity: Rarity,
    effect_type: Option<&'static str>,
    effect_value: Option<i32>,
    duration_days: Option<i32>,
}

const SHOP_ITEMS: &[ShopSeed] = &[
    ShopSeed {
        name: "Pro Habit Analytics",
        description: "Unlock advanced analytics to track deeper trends.",
        category: ShopCategory::Feature,
        price_points: 700,
        icon: "📊",
        rarity: Rarity::Rare,
        effect_type: Some("analytics"),
        effect_value: None,
        duration_days: None,
    },
    ShopSeed {
        name: "2× XP Boost (7 days)",
        description: "Double points from activities for 7 days.",
        category: ShopCategory::Boost,
        price_points: 300,
        icon: "⚡",
        rarity: Rarity::Epic,
        effect_type: Some("xp_multiplier"),
        effect_value: Some(2),
        duration_days: Some(7),
    },
    ShopSeed {
        name: "Custom Profile Theme",
        description: "Personalize your profile with an exclusive theme.",
        category: ShopCategory::Customization,
        price_points: 250,
        icon: "🎨",
        rarity: Rarity::Common,
        effect_type: Some("theme"),
        effect_value: None,
        duration_days: None,
    },
    ShopSeed {
        name: "Meditation Pack (3 days)",
        description: "A curated set of guided meditations.",
        category: ShopCategory::Reward,
        price_points: 150,
        icon: "🧘",
        rarity: Rarity::Common,
        effect_type: None,
        effect_value: None,
        duration_days: Some(3),
    },
    ShopSeed {
        name: "Priority Support",
        description: "Get faster support responses for your account.",
        category: ShopCategory::Feature,
        price_points: 900,
        icon: "🎧",
        rarity: Rarity::Legendary,
        effect_type: Some("priority_support"),
        effect_value: None,
        duration_days: None,
    },
    ShopSeed {
        name: "Focus Mode (30 days)",
        description: "Remove distractions inside the app for 30 days.",
        category: ShopCategory::Boost,
        price_points: 500,
        icon: "🎯",
        rarity: Rarity::Epic,
        effect_type: Some("focus_mode"),
        effect_value: None,
        duration_days: Some(30),
    },
];

/// Insert the achievement and shop catalogs. Rows that already exist
/// (by code / name) are left untouched, so this runs on every start.
pub async fn seed_catalog(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut inserted = 0;

    for seed in ACHIEVEMENTS {
        let row = achievement::ActiveModel {
            code: Set(seed.code.to_owned()),
            name: Set(seed.name.to_owned()),
            description: Set(seed.description.to_owned()),
            icon: Set(seed.icon.to_owned()),
            points_reward: Set(seed.points_reward),
            requirement_type: Set(seed.requirement_type),
            requirement_value: Set(seed.requirement_value),
            rarity: Set(seed.rarity),
            ..Default::default()
        };

        inserted += achievement::Entity::insert(row)
            .on_conflict(
                OnConflict::column(achievement::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    let now = Utc::now().to_rfc3339();
    for seed in SHOP_ITEMS {
        let row = shop_item::ActiveModel {
            name: Set(seed.name.to_owned()),
            description: Set(seed.description.to_owned()),
            category: Set(seed.category),
            price_points: Set(seed.price_points),
            icon: Set(seed.icon.to_owned()),
            rarity: Set(seed.rarity),
            is_available: Set(true),
            effect_type: Set(seed.effect_type.map(str::to_owned)),
            effect_value: Set(seed.effect_value),
            duration_days: Set(seed.duration_days),
            created_at: Set(now.clone()),
            ..Default::default()
        };

        inserted += shop_item::Entity::insert(row)
            .on_conflict(
                OnConflict::column(shop_item::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    tracing::debug!("Catalog seeded ({} new rows)", inserted);
    Ok(())
}

/// Demo account `demo` / `demo1234` with a couple of habits, a recent
/// streak, one upcoming event and a public room.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    if user::Entity::find()
        .filter(user::Column::Username.eq("demo"))
        .one(db)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let password_hash = hash_password("demo1234").map_err(DbErr::Custom)?;
    let now = Utc::now();
    let now_str = now.to_rfc3339();

    let demo = user::ActiveModel {
        username: Set("demo".to_owned()),
        email: Set(Some("demo@example.com".to_owned())),
        password_hash: Set(password_hash),
        first_name: Set(Some("Demo".to_owned())),
        last_name: Set(Some("User".to_owned())),
        created_at: Set(now_str.clone()),
        updated_at: Set(now_str.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let habits = [
        ("Drink water", "💧", "#0EA5E9"),
        ("Read 20 pages", "📚", "#3B82F6"),
    ];

    let today = now.date_naive();
    for (title, icon, color) in habits {
        let habit = habit::ActiveModel {
            user_id: Set(demo.id),
            title: Set(title.to_owned()),
            description: Set(None),
            frequency: Set(Default::default()),
            target_count: Set(1),
            color: Set(color.to_owned()),
            icon: Set(icon.to_owned()),
            is_active: Set(true),
            created_at: Set(now_str.clone()),
            updated_at: Set(now_str.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        // Completed on each of the last three days, not today
        for days_ago in 1..=3 {
            habit_entry::ActiveModel {
                habit_id: Set(habit.id),
                entry_date: Set(today - Duration::days(days_ago)),
                completed: Set(true),
                notes: Set(Some("Completed".to_owned())),
                points_awarded: Set(false),
                created_at: Set(now_str.clone()),
                updated_at: Set(now_str.clone()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    let event = community_event::ActiveModel {
        title: Set("Morning Routine Workshop".to_owned()),
        description: Set("Build a morning routine that sticks.".to_owned()),
        event_type: Set(EventType::Workshop),
        host_id: Set(demo.id),
        start_time: Set(now + Duration::days(7)),
        end_time: Set(now + Duration::days(7) + Duration::hours(1)),
        max_participants: Set(Some(50)),
        is_online: Set(true),
        meeting_url: Set(None),
        location: Set(None),
        price_points: Set(0),
        is_active: Set(true),
        created_at: Set(now_str.clone()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    chat_room::ActiveModel {
        name: Set("General".to_owned()),
        description: Set(Some("Talk about anything habit related".to_owned())),
        room_type: Set(RoomType::Public),
        event_id: Set(None),
        max_members: Set(None),
        is_active: Set(true),
        created_by: Set(demo.id),
        created_at: Set(now_str),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(
        "Demo user {} seeded with event {}",
        demo.username,
        event.id
    );
    Ok(())
}
