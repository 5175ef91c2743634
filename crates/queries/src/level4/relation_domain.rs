//! Reads that cross domain boundaries: chat, communities and exchanges.

use std::collections::HashMap;

use bookswap_database::{
    Book, ChatThread, Community, CommunityMember, CommunityMessage, CommunityThread, Exchange,
    Message, User,
};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::QueryResult;
use crate::level2::query_filter::attach_exchange_relations;
use crate::preload::{push_id_list, unique_ids, users_by_id, UserPreload};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserCommunityCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub community_count: i64,
}

/// Loads the non-deleted rows of `table` whose `column` is one of `ids`,
/// oldest first.
async fn rows_in<T>(pool: &SqlitePool, table: &str, column: &str, ids: &[i64]) -> QueryResult<Vec<T>>
where
    T: for<'r> FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
{
    let ids = unique_ids(ids.iter().copied());
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM ");
    query.push(table).push(" WHERE ").push(column).push(" IN ");
    push_id_list(&mut query, &ids);
    query.push(" AND deleted_at IS NULL ORDER BY created_at, id");

    Ok(query.build_query_as::<T>().fetch_all(pool).await?)
}

/// Chat threads of an exchange with their messages (and senders) and the
/// thread creator with profile.
pub async fn get_chat_threads_of_exchange(
    pool: &SqlitePool,
    exchange_id: i64,
) -> QueryResult<Vec<ChatThread>> {
    let mut threads: Vec<ChatThread> = sqlx::query_as(
        "SELECT * FROM chat_threads WHERE exchange_id = ? AND deleted_at IS NULL ORDER BY id",
    )
    .bind(exchange_id)
    .fetch_all(pool)
    .await?;

    let thread_ids: Vec<i64> = threads.iter().map(|thread| thread.id).collect();
    let messages: Vec<Message> = rows_in(pool, "messages", "thread_id", &thread_ids).await?;

    let creator_ids: Vec<i64> = threads.iter().map(|thread| thread.created_by).collect();
    let creators = users_by_id(pool, &creator_ids, UserPreload::PROFILE).await?;
    let sender_ids: Vec<i64> = messages.iter().map(|message| message.sender_id).collect();
    let senders = users_by_id(pool, &sender_ids, UserPreload::NONE).await?;

    let mut by_thread: HashMap<i64, Vec<Message>> = HashMap::new();
    for mut message in messages {
        message.sender = senders.get(&message.sender_id).cloned();
        by_thread.entry(message.thread_id).or_default().push(message);
    }

    for thread in threads.iter_mut() {
        thread.creator = creators.get(&thread.created_by).cloned();
        thread.messages = by_thread.remove(&thread.id).unwrap_or_default();
    }

    Ok(threads)
}

/// Threads of a community with creator and messages (and senders).
pub async fn get_community_threads(
    pool: &SqlitePool,
    community_id: i64,
) -> QueryResult<Vec<CommunityThread>> {
    let mut threads: Vec<CommunityThread> = sqlx::query_as(
        "SELECT * FROM community_threads WHERE community_id = ? AND deleted_at IS NULL ORDER BY id",
    )
    .bind(community_id)
    .fetch_all(pool)
    .await?;

    let thread_ids: Vec<i64> = threads.iter().map(|thread| thread.id).collect();
    let messages: Vec<CommunityMessage> =
        rows_in(pool, "community_messages", "thread_id", &thread_ids).await?;

    let user_ids: Vec<i64> = threads
        .iter()
        .map(|thread| thread.created_by)
        .chain(messages.iter().map(|message| message.sender_id))
        .collect();
    let users = users_by_id(pool, &user_ids, UserPreload::NONE).await?;

    let mut by_thread: HashMap<i64, Vec<CommunityMessage>> = HashMap::new();
    for mut message in messages {
        message.sender = users.get(&message.sender_id).cloned();
        by_thread.entry(message.thread_id).or_default().push(message);
    }

    for thread in threads.iter_mut() {
        thread.creator = users.get(&thread.created_by).cloned();
        thread.messages = by_thread.remove(&thread.id).unwrap_or_default();
    }

    Ok(threads)
}

/// Users that are members of at least `min_communities` communities.
pub async fn get_users_in_at_least_n_communities(
    pool: &SqlitePool,
    min_communities: i64,
) -> QueryResult<Vec<UserCommunityCount>> {
    Ok(sqlx::query_as(
        "SELECT users.*, COUNT(cm.id) AS community_count
         FROM users
         JOIN community_members cm ON cm.user_id = users.id AND cm.deleted_at IS NULL
         JOIN communities c ON c.id = cm.community_id AND c.deleted_at IS NULL
         WHERE users.deleted_at IS NULL
         GROUP BY users.id
         HAVING COUNT(cm.id) >= ?
         ORDER BY community_count DESC, users.id",
    )
    .bind(min_communities)
    .fetch_all(pool)
    .await?)
}

/// Communities that require a paid plan to chat, with creator and members.
pub async fn get_paid_communities(pool: &SqlitePool) -> QueryResult<Vec<Community>> {
    let mut communities: Vec<Community> = sqlx::query_as(
        "SELECT * FROM communities WHERE require_paid_chat = 1 AND deleted_at IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let community_ids: Vec<i64> = communities.iter().map(|community| community.id).collect();
    let members: Vec<CommunityMember> =
        rows_in(pool, "community_members", "community_id", &community_ids).await?;

    let user_ids: Vec<i64> = communities
        .iter()
        .map(|community| community.creator_id)
        .chain(members.iter().map(|member| member.user_id))
        .collect();
    let users = users_by_id(pool, &user_ids, UserPreload::NONE).await?;

    let mut by_community: HashMap<i64, Vec<CommunityMember>> = HashMap::new();
    for mut member in members {
        member.user = users.get(&member.user_id).cloned();
        by_community
            .entry(member.community_id)
            .or_default()
            .push(member);
    }

    for community in communities.iter_mut() {
        community.creator = users.get(&community.creator_id).cloned();
        community.members = by_community.remove(&community.id).unwrap_or_default();
    }

    Ok(communities)
}

/// Exchanges the user requested or responded to, newest first.
pub async fn get_exchanges_of_user(pool: &SqlitePool, user_id: i64) -> QueryResult<Vec<Exchange>> {
    let mut exchanges: Vec<Exchange> = sqlx::query_as(
        "SELECT * FROM exchanges
         WHERE (requester_id = ? OR responder_id = ?) AND deleted_at IS NULL
         ORDER BY requested_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    attach_exchange_relations(pool, &mut exchanges).await?;
    Ok(exchanges)
}

/// Books owned by the user that were traded in a completed exchange.
pub async fn get_books_of_user_in_completed_exchanges(
    pool: &SqlitePool,
    user_id: i64,
) -> QueryResult<Vec<Book>> {
    Ok(sqlx::query_as(
        "SELECT DISTINCT books.* FROM books
         JOIN exchanges e
           ON (e.requester_book_id = books.id OR e.responder_book_id = books.id)
          AND e.status = 'completed'
          AND e.deleted_at IS NULL
         WHERE books.owner_id = ? AND books.deleted_at IS NULL
         ORDER BY books.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}
