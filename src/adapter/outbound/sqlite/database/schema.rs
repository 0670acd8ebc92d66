//! Table definitions for the embedded migrations.
//!
//! Maintained by hand: row IDs are declared `BigInt` so they map onto the
//! `i64` identifiers, where `diesel print-schema` would emit `Integer` for
//! `INTEGER PRIMARY KEY`. Keep in step with `migrations/`.

diesel::table! {
    chat_groups (id) {
        id -> BigInt,
        owner_uid -> BigInt,
        name -> Text,
        description -> Text,
        avatar -> Text,
        max_members -> Integer,
        member_count -> Integer,
        status -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    friend_requests (id) {
        id -> BigInt,
        uid -> BigInt,
        friend_uid -> BigInt,
        status -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    friends (id) {
        id -> BigInt,
        uid -> BigInt,
        friend_uid -> BigInt,
        status -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    group_members (id) {
        id -> BigInt,
        gid -> BigInt,
        uid -> BigInt,
        role -> Integer,
        status -> Integer,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    sessions (id) {
        id -> Text,
        kind -> Integer,
        from_id -> BigInt,
        to_id -> BigInt,
        created_by -> BigInt,
        created_at -> BigInt,
        updated_at -> BigInt,
    }
}

diesel::table! {
    users (uid) {
        uid -> BigInt,
        name -> Text,
        avatar -> Text,
        status -> Integer,
    }
}

diesel::joinable!(group_members -> chat_groups (gid));

diesel::allow_tables_to_appear_in_same_query!(
    chat_groups,
    friend_requests,
    friends,
    group_members,
    sessions,
    users,
);
