// Conversions from service records to protobuf messages.
// Timestamps travel as RFC 3339 strings; unset optional fields become "".

use chrono::{DateTime, SecondsFormat, Utc};

use super::nova::post_service as proto;
use crate::models::{
    AuthorInfo, CommentWithAuthor, DonationWithDonor, Like, LikeComment, PageMeta, PostSnapshot,
};
use crate::payment::CreateOrderResponse;
use crate::services::feed_ranking::FeedResponse;
use crate::services::posts::PostTotals;

pub fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn optional_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(timestamp).unwrap_or_default()
}

fn clamp_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

pub fn page_meta(meta: PageMeta) -> proto::PageMeta {
    proto::PageMeta {
        page: clamp_i32(meta.page),
        take: clamp_i32(meta.take),
        item_count: meta.item_count,
        page_count: meta.page_count,
        has_previous_page: meta.has_previous_page,
        has_next_page: meta.has_next_page,
    }
}

pub fn user_info(author: AuthorInfo) -> proto::UserInfo {
    proto::UserInfo {
        id: author.id.to_string(),
        username: author.username.unwrap_or_default(),
        profile_picture: author.profile_picture.unwrap_or_default(),
    }
}

pub fn post_info(snapshot: PostSnapshot) -> proto::PostInfo {
    let author = snapshot.author();
    let post = snapshot.post;

    proto::PostInfo {
        id: post.id.to_string(),
        content: post.content,
        media_path: post.media_path,
        created_at: timestamp(post.created_at),
        created_by: post.created_by.unwrap_or_default(),
        updated_at: timestamp(post.updated_at),
        updated_by: post.updated_by.unwrap_or_default(),
        deleted_at: optional_timestamp(post.deleted_at),
        deleted_by: post.deleted_by.unwrap_or_default(),
        user_id: post.user_id.to_string(),
        user_info: Some(user_info(author)),
        like_count: snapshot.like_count,
        comment_count: snapshot.comment_count,
        is_liked: snapshot.is_liked,
    }
}

pub fn comment_info(record: CommentWithAuthor) -> proto::CommentInfo {
    let author = record.author();
    let comment = record.comment;

    proto::CommentInfo {
        id: comment.id.to_string(),
        content: comment.content,
        media_path: comment.media_path,
        created_at: timestamp(comment.created_at),
        created_by: comment.created_by.unwrap_or_default(),
        updated_at: timestamp(comment.updated_at),
        updated_by: comment.updated_by.unwrap_or_default(),
        deleted_at: optional_timestamp(comment.deleted_at),
        deleted_by: comment.deleted_by.unwrap_or_default(),
        post_id: comment.post_id.to_string(),
        user_id: comment.user_id.to_string(),
        user: Some(user_info(author)),
    }
}

pub fn like_info(like: Like) -> proto::LikeInfo {
    proto::LikeInfo {
        id: like.id.to_string(),
        post_id: like.post_id.to_string(),
        user_id: like.user_id.to_string(),
        created_at: timestamp(like.created_at),
        created_by: like.created_by.unwrap_or_default(),
        updated_at: timestamp(like.updated_at),
        updated_by: like.updated_by.unwrap_or_default(),
        deleted_at: optional_timestamp(like.deleted_at),
        deleted_by: like.deleted_by.unwrap_or_default(),
    }
}

pub fn like_comment_info(like: LikeComment) -> proto::LikeCommentInfo {
    proto::LikeCommentInfo {
        id: like.id.to_string(),
        comment_id: like.comment_id.to_string(),
        user_id: like.user_id.to_string(),
        created_at: timestamp(like.created_at),
        created_by: like.created_by.unwrap_or_default(),
        updated_at: timestamp(like.updated_at),
        updated_by: like.updated_by.unwrap_or_default(),
        deleted_at: optional_timestamp(like.deleted_at),
        deleted_by: like.deleted_by.unwrap_or_default(),
    }
}

pub fn donation_info(record: DonationWithDonor) -> proto::DonationInfo {
    let donation = record.donation;

    proto::DonationInfo {
        id: donation.id.to_string(),
        post_id: donation.post_id.to_string(),
        user_id: donation.user_id.to_string(),
        username: record.username.unwrap_or_default(),
        amount: donation.amount,
        app_trans_id: donation.app_trans_id.unwrap_or_default(),
        created_at: timestamp(donation.created_at),
        created_by: donation.created_by.unwrap_or_default(),
        updated_at: timestamp(donation.updated_at),
        updated_by: donation.updated_by.unwrap_or_default(),
        deleted_at: optional_timestamp(donation.deleted_at),
        deleted_by: donation.deleted_by.unwrap_or_default(),
    }
}

pub fn totals(totals: PostTotals) -> proto::TotalPostsResponse {
    proto::TotalPostsResponse {
        total: totals.total,
        old_count: totals.old_count,
        current_count: totals.current_count,
        percentage_post_change: totals.percentage_post_change,
        join_counts: totals.join_counts.into_iter().collect(),
    }
}

pub fn random_posts(response: FeedResponse) -> proto::RandomPostsResponse {
    let cursor = response.cursor;

    proto::RandomPostsResponse {
        items: response.items.into_iter().map(post_info).collect(),
        cursor: Some(proto::CursorMeta {
            value: cursor.value.map(|id| id.to_string()).unwrap_or_default(),
            page_size: clamp_i32(cursor.page_size as i64),
            total_count: cursor.total_count as i64,
            has_previous: cursor.has_previous,
            has_next: cursor.has_next,
        }),
        message: response.message,
    }
}

pub fn donation_order(order: CreateOrderResponse) -> proto::DonationOrderResponse {
    proto::DonationOrderResponse {
        return_code: order.return_code,
        return_message: order.return_message,
        sub_return_code: order.sub_return_code,
        sub_return_message: order.sub_return_message,
        zp_trans_token: order.zp_trans_token,
        order_url: order.order_url,
        order_token: order.order_token,
        app_trans_id: order.app_trans_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageOptions;
    use crate::services::feed_ranking::CursorMeta;
    use crate::services::feed_ranking::test_support::snapshot;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        assert_eq!(timestamp(ts), "2024-06-01T08:30:00.000Z");
        assert_eq!(optional_timestamp(None), "");
    }

    #[test]
    fn test_post_info() {
        let author = Uuid::new_v4();
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let mut post = snapshot(author, 4, 2, created);
        post.is_liked = true;
        let id = post.id();

        let info = post_info(post);
        assert_eq!(info.id, id.to_string());
        assert_eq!(info.user_id, author.to_string());
        assert_eq!(info.like_count, 4);
        assert_eq!(info.comment_count, 2);
        assert!(info.is_liked);
        assert_eq!(info.deleted_at, "");
        assert_eq!(info.user_info.unwrap().username, "author");
    }

    #[test]
    fn test_random_posts_cursor() {
        let created = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
        let post = snapshot(Uuid::new_v4(), 0, 0, created);
        let last = post.id();

        let response = random_posts(FeedResponse {
            items: vec![post],
            cursor: CursorMeta {
                value: Some(last),
                page_size: 1,
                total_count: 3,
                has_previous: false,
                has_next: true,
            },
            cursor_reset: false,
            message: "Success".into(),
        });

        let cursor = response.cursor.unwrap();
        assert_eq!(cursor.value, last.to_string());
        assert_eq!(cursor.total_count, 3);
        assert!(cursor.has_next);
        assert_eq!(response.items.len(), 1);
    }

    #[test]
    fn test_empty_cursor_value() {
        let response = random_posts(FeedResponse {
            items: Vec::new(),
            cursor: CursorMeta {
                value: None,
                page_size: 10,
                total_count: 0,
                has_previous: false,
                has_next: false,
            },
            cursor_reset: false,
            message: "Success".into(),
        });
        assert_eq!(response.cursor.unwrap().value, "");
    }

    #[test]
    fn test_page_meta() {
        let meta = page_meta(PageMeta::new(PageOptions { page: 2, take: 5 }, 11));
        assert_eq!(meta.page, 2);
        assert_eq!(meta.take, 5);
        assert_eq!(meta.page_count, 3);
        assert!(meta.has_next_page);
    }
}
