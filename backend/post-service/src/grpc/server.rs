// gRPC service implementation for post service
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tonic::{Code, Request, Response, Status};
use tracing::{debug, info};

use super::convert;
use super::nova::post_service::post_service_server::{PostService, PostServiceServer};
use super::nova::post_service::*;
use crate::error::{AppError, Result};
use crate::metrics::record_grpc;
use crate::payment::DonationItem;
use crate::services::feed_ranking::FeedRequest;
use crate::services::{parse_id, parse_optional_id, Services, TotalsPeriod, SUCCESS_MESSAGE};

/// PostService gRPC implementation
#[derive(Clone)]
pub struct PostServiceImpl {
    services: Services,
}

impl PostServiceImpl {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// Record the call outcome and convert service errors into statuses.
fn respond<T>(method: &'static str, result: Result<T>) -> std::result::Result<Response<T>, Status> {
    match result {
        Ok(message) => {
            record_grpc(method, Code::Ok);
            Ok(Response::new(message))
        }
        Err(err) => {
            let status = Status::from(err);
            record_grpc(method, status.code());
            debug!(method, code = ?status.code(), "gRPC call failed");
            Err(status)
        }
    }
}

fn optional_text(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn deleted(message: &str) -> DeleteResponse {
    DeleteResponse {
        data: String::new(),
        message: message.to_string(),
    }
}

// Request handling proper; the trait impl below only wraps these with `respond`.
impl PostServiceImpl {
    async fn all_posts(&self, req: GetAllPostsRequest, deleted: bool) -> Result<PostsResponse> {
        let posts = &self.services.posts;
        let options = posts.page_options(req.page, req.take)?;
        let viewer_id = parse_optional_id(&req.user_id)?;
        let content = optional_text(&req.content);

        let page = if deleted {
            posts.list_deleted_posts(options, content, viewer_id).await?
        } else {
            posts.list_posts(options, content, viewer_id).await?
        };

        Ok(PostsResponse {
            data: page.data.into_iter().map(convert::post_info).collect(),
            meta: Some(convert::page_meta(page.meta)),
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn random_posts(&self, req: GetRandomPostsRequest) -> Result<RandomPostsResponse> {
        let request = FeedRequest {
            content: optional_text(&req.content).map(str::to_string),
            cursor: optional_text(&req.cursor).map(str::to_string),
            page_size: i64::from(req.page_size),
            viewer_id: parse_optional_id(&req.user_id)?,
        };

        let response = self.services.feed.get_random_posts(request).await?;
        Ok(convert::random_posts(response))
    }

    async fn total_posts(&self, req: GetTotalPostsRequest) -> Result<TotalPostsResponse> {
        let period = TotalsPeriod::parse(&req.period)?;
        let totals = self.services.posts.total_posts(period).await?;
        Ok(convert::totals(totals))
    }

    async fn post_by_id(&self, req: GetPostIdRequest) -> Result<PostInfo> {
        let post_id = parse_id(&req.id)?;
        let viewer_id = parse_optional_id(&req.user_id)?;
        let post = self.services.posts.get_post(post_id, viewer_id).await?;
        Ok(convert::post_info(post))
    }

    async fn new_post(&self, req: CreatePostRequest) -> Result<PostInfo> {
        let user_id = parse_id(&req.user_id)?;
        let post = self
            .services
            .posts
            .create_post(user_id, &req.content, req.media_path)
            .await?;
        Ok(convert::post_info(post))
    }

    async fn edit_post(&self, req: UpdatePostRequest) -> Result<PostInfo> {
        let post_id = parse_id(&req.id)?;
        let updated_by = parse_optional_id(&req.user_id)?;
        let post = self
            .services
            .posts
            .update_post(post_id, Some(&req.content), req.media_path, updated_by)
            .await?;
        Ok(convert::post_info(post))
    }

    async fn all_comments(&self, req: GetAllCommentsRequest) -> Result<CommentsResponse> {
        let comments = &self.services.comments;
        let options = comments.page_options(req.page, req.take)?;
        let post_id = parse_optional_id(&req.post_id)?;
        let page = comments
            .list_comments(options, post_id, optional_text(&req.content))
            .await?;

        Ok(CommentsResponse {
            data: page.data.into_iter().map(convert::comment_info).collect(),
            meta: Some(convert::page_meta(page.meta)),
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn new_comment(&self, req: CreateCommentRequest) -> Result<CommentInfo> {
        let post_id = parse_id(&req.post_id)?;
        let user_id = parse_id(&req.user_id)?;
        let comment = self
            .services
            .comments
            .create_comment(post_id, user_id, &req.content, req.media_path)
            .await?;
        Ok(convert::comment_info(comment))
    }

    async fn edit_comment(&self, req: UpdateCommentRequest) -> Result<CommentInfo> {
        let comment_id = parse_id(&req.id)?;
        let comment = self
            .services
            .comments
            .update_comment(comment_id, Some(&req.content), req.media_path)
            .await?;
        Ok(convert::comment_info(comment))
    }

    async fn all_likes(&self, req: GetAllLikesRequest) -> Result<LikesResponse> {
        let likes = &self.services.likes;
        let options = likes.page_options(req.page, req.take)?;
        let post_id = parse_optional_id(&req.post_id)?;
        let page = likes.list_likes(options, post_id).await?;

        Ok(LikesResponse {
            data: page.data.into_iter().map(convert::like_info).collect(),
            meta: Some(convert::page_meta(page.meta)),
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn new_like(&self, req: CreateLikeRequest) -> Result<LikeInfo> {
        let post_id = parse_id(&req.post_id)?;
        let user_id = parse_id(&req.user_id)?;
        let like = self.services.likes.create_like(post_id, user_id).await?;
        Ok(convert::like_info(like))
    }

    async fn all_like_comments(
        &self,
        req: GetAllLikesCommentRequest,
    ) -> Result<LikeCommentsResponse> {
        let like_comments = &self.services.like_comments;
        let options = like_comments.page_options(req.page, req.take)?;
        let comment_id = parse_optional_id(&req.comment_id)?;
        let page = like_comments.list_like_comments(options, comment_id).await?;

        Ok(LikeCommentsResponse {
            data: page.data.into_iter().map(convert::like_comment_info).collect(),
            meta: Some(convert::page_meta(page.meta)),
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn new_like_comment(&self, req: CreateLikeCommentRequest) -> Result<LikeCommentInfo> {
        let comment_id = parse_id(&req.comment_id)?;
        let user_id = parse_id(&req.user_id)?;
        let like = self
            .services
            .like_comments
            .create_like_comment(comment_id, user_id)
            .await?;
        Ok(convert::like_comment_info(like))
    }

    async fn toggle_like(
        &self,
        req: CreateLikeCommentRequest,
    ) -> Result<ToggleLikeCommentResponse> {
        let comment_id = parse_id(&req.comment_id)?;
        let user_id = parse_id(&req.user_id)?;
        let outcome = self
            .services
            .like_comments
            .toggle_like_comment(comment_id, user_id)
            .await?;

        let message = outcome.message().to_string();
        Ok(ToggleLikeCommentResponse {
            data: match outcome {
                crate::services::ToggleOutcome::Liked(like) => {
                    Some(convert::like_comment_info(like))
                }
                crate::services::ToggleOutcome::Unliked => None,
            },
            message,
        })
    }

    async fn all_donations(&self, req: GetDonationsRequest) -> Result<DonationsResponse> {
        let donations = &self.services.donations;
        let options = donations.page_options(req.page, req.take)?;
        let post_id = parse_optional_id(&req.post_id)?;
        let page = donations.list_donations(options, post_id).await?;

        Ok(DonationsResponse {
            data: page.data.into_iter().map(convert::donation_info).collect(),
            meta: Some(convert::page_meta(page.meta)),
            message: SUCCESS_MESSAGE.to_string(),
        })
    }

    async fn new_donation(&self, req: CreateDonationRequest) -> Result<DonationOrderResponse> {
        let item = DonationItem {
            post_id: parse_id(&req.post_id)?,
            user_id: parse_id(&req.user_id)?,
            amount: req.amount,
        };
        let order = self.services.donations.create_donation(item).await?;
        Ok(convert::donation_order(order))
    }
}

#[tonic::async_trait]
impl PostService for PostServiceImpl {
    async fn get_all_posts(
        &self,
        request: Request<GetAllPostsRequest>,
    ) -> std::result::Result<Response<PostsResponse>, Status> {
        respond("GetAllPosts", self.all_posts(request.into_inner(), false).await)
    }

    /// Ranked feed page after the request cursor
    async fn get_random_posts(
        &self,
        request: Request<GetRandomPostsRequest>,
    ) -> std::result::Result<Response<RandomPostsResponse>, Status> {
        respond("GetRandomPosts", self.random_posts(request.into_inner()).await)
    }

    async fn get_posts_deleted(
        &self,
        request: Request<GetAllPostsRequest>,
    ) -> std::result::Result<Response<PostsResponse>, Status> {
        respond("GetPostsDeleted", self.all_posts(request.into_inner(), true).await)
    }

    async fn get_total_posts(
        &self,
        request: Request<GetTotalPostsRequest>,
    ) -> std::result::Result<Response<TotalPostsResponse>, Status> {
        respond("GetTotalPosts", self.total_posts(request.into_inner()).await)
    }

    async fn get_post_id(
        &self,
        request: Request<GetPostIdRequest>,
    ) -> std::result::Result<Response<PostInfo>, Status> {
        respond("GetPostId", self.post_by_id(request.into_inner()).await)
    }

    async fn create_post(
        &self,
        request: Request<CreatePostRequest>,
    ) -> std::result::Result<Response<PostInfo>, Status> {
        respond("CreatePost", self.new_post(request.into_inner()).await)
    }

    async fn check_post_exists(
        &self,
        request: Request<CheckExistsRequest>,
    ) -> std::result::Result<Response<CheckExistsResponse>, Status> {
        let result = async {
            let post_id = parse_id(&request.into_inner().id)?;
            let exists = self.services.posts.post_exists(post_id).await?;
            Ok::<_, AppError>(CheckExistsResponse { exists })
        }
        .await;
        respond("CheckPostExists", result)
    }

    async fn update_post(
        &self,
        request: Request<UpdatePostRequest>,
    ) -> std::result::Result<Response<PostInfo>, Status> {
        respond("UpdatePost", self.edit_post(request.into_inner()).await)
    }

    async fn delete_post(
        &self,
        request: Request<DeleteRequest>,
    ) -> std::result::Result<Response<DeleteResponse>, Status> {
        let result = self
            .services
            .posts
            .delete_post(&request.into_inner().id, None)
            .await
            .map(|d| deleted(d.message));
        respond("DeletePost", result)
    }

    async fn get_all_comments(
        &self,
        request: Request<GetAllCommentsRequest>,
    ) -> std::result::Result<Response<CommentsResponse>, Status> {
        respond("GetAllComments", self.all_comments(request.into_inner()).await)
    }

    async fn get_comment_id(
        &self,
        request: Request<GetByIdRequest>,
    ) -> std::result::Result<Response<CommentInfo>, Status> {
        let result = async {
            let comment_id = parse_id(&request.into_inner().id)?;
            let comment = self.services.comments.get_comment(comment_id).await?;
            Ok::<_, AppError>(convert::comment_info(comment))
        }
        .await;
        respond("GetCommentId", result)
    }

    async fn create_comment(
        &self,
        request: Request<CreateCommentRequest>,
    ) -> std::result::Result<Response<CommentInfo>, Status> {
        respond("CreateComment", self.new_comment(request.into_inner()).await)
    }

    async fn check_comment_exists(
        &self,
        request: Request<CheckExistsRequest>,
    ) -> std::result::Result<Response<CheckExistsResponse>, Status> {
        let result = async {
            let comment_id = parse_id(&request.into_inner().id)?;
            let exists = self.services.comments.comment_exists(comment_id).await?;
            Ok::<_, AppError>(CheckExistsResponse { exists })
        }
        .await;
        respond("CheckCommentExists", result)
    }

    async fn update_comment(
        &self,
        request: Request<UpdateCommentRequest>,
    ) -> std::result::Result<Response<CommentInfo>, Status> {
        respond("UpdateComment", self.edit_comment(request.into_inner()).await)
    }

    async fn delete_comment(
        &self,
        request: Request<DeleteRequest>,
    ) -> std::result::Result<Response<DeleteResponse>, Status> {
        let result = self
            .services
            .comments
            .delete_comment(&request.into_inner().id, None)
            .await
            .map(|d| deleted(d.message));
        respond("DeleteComment", result)
    }

    async fn get_all_like(
        &self,
        request: Request<GetAllLikesRequest>,
    ) -> std::result::Result<Response<LikesResponse>, Status> {
        respond("GetAllLike", self.all_likes(request.into_inner()).await)
    }

    async fn get_like_id(
        &self,
        request: Request<GetByIdRequest>,
    ) -> std::result::Result<Response<LikeInfo>, Status> {
        let result = async {
            let like_id = parse_id(&request.into_inner().id)?;
            let like = self.services.likes.get_like(like_id).await?;
            Ok::<_, AppError>(convert::like_info(like))
        }
        .await;
        respond("GetLikeId", result)
    }

    async fn create_like(
        &self,
        request: Request<CreateLikeRequest>,
    ) -> std::result::Result<Response<LikeInfo>, Status> {
        respond("CreateLike", self.new_like(request.into_inner()).await)
    }

    async fn check_like_exists(
        &self,
        request: Request<CheckExistsRequest>,
    ) -> std::result::Result<Response<CheckExistsResponse>, Status> {
        let result = async {
            let like_id = parse_id(&request.into_inner().id)?;
            let exists = self.services.likes.like_exists(like_id).await?;
            Ok::<_, AppError>(CheckExistsResponse { exists })
        }
        .await;
        respond("CheckLikeExists", result)
    }

    async fn delete_like(
        &self,
        request: Request<DeleteRequest>,
    ) -> std::result::Result<Response<DeleteResponse>, Status> {
        let result = self
            .services
            .likes
            .delete_like(&request.into_inner().id, None)
            .await
            .map(|d| deleted(d.message));
        respond("DeleteLike", result)
    }

    async fn get_all_likes_comment(
        &self,
        request: Request<GetAllLikesCommentRequest>,
    ) -> std::result::Result<Response<LikeCommentsResponse>, Status> {
        respond("GetAllLikesComment", self.all_like_comments(request.into_inner()).await)
    }

    async fn get_like_comment_id(
        &self,
        request: Request<GetByIdRequest>,
    ) -> std::result::Result<Response<LikeCommentInfo>, Status> {
        let result = async {
            let like_comment_id = parse_id(&request.into_inner().id)?;
            let like = self
                .services
                .like_comments
                .get_like_comment(like_comment_id)
                .await?;
            Ok::<_, AppError>(convert::like_comment_info(like))
        }
        .await;
        respond("GetLikeCommentId", result)
    }

    async fn create_like_comment(
        &self,
        request: Request<CreateLikeCommentRequest>,
    ) -> std::result::Result<Response<LikeCommentInfo>, Status> {
        respond("CreateLikeComment", self.new_like_comment(request.into_inner()).await)
    }

    async fn check_like_comment_exists(
        &self,
        request: Request<CheckExistsRequest>,
    ) -> std::result::Result<Response<CheckExistsResponse>, Status> {
        let result = async {
            let like_comment_id = parse_id(&request.into_inner().id)?;
            let exists = self
                .services
                .like_comments
                .like_comment_exists(like_comment_id)
                .await?;
            Ok::<_, AppError>(CheckExistsResponse { exists })
        }
        .await;
        respond("CheckLikeCommentExists", result)
    }

    async fn delete_like_comment(
        &self,
        request: Request<DeleteRequest>,
    ) -> std::result::Result<Response<DeleteResponse>, Status> {
        let result = self
            .services
            .like_comments
            .delete_like_comment(&request.into_inner().id, None)
            .await
            .map(|d| deleted(d.message));
        respond("DeleteLikeComment", result)
    }

    async fn toggle_like_comment(
        &self,
        request: Request<CreateLikeCommentRequest>,
    ) -> std::result::Result<Response<ToggleLikeCommentResponse>, Status> {
        respond("ToggleLikeComment", self.toggle_like(request.into_inner()).await)
    }

    async fn get_donations(
        &self,
        request: Request<GetDonationsRequest>,
    ) -> std::result::Result<Response<DonationsResponse>, Status> {
        respond("GetDonations", self.all_donations(request.into_inner()).await)
    }

    async fn create_donation(
        &self,
        request: Request<CreateDonationRequest>,
    ) -> std::result::Result<Response<DonationOrderResponse>, Status> {
        respond("CreateDonation", self.new_donation(request.into_inner()).await)
    }
}

/// Start the gRPC server and serve until `shutdown` fires.
pub async fn start_grpc_server(
    addr: SocketAddr,
    services: Services,
    max_message_bytes: usize,
    mut shutdown: broadcast::Receiver<()>,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tonic::transport::Server;
    use tonic_health::server::health_reporter;

    info!("Starting gRPC server at {}", addr);

    let service = PostServiceServer::new(PostServiceImpl::new(services))
        .max_decoding_message_size(max_message_bytes)
        .max_encoding_message_size(max_message_bytes);

    // Health service
    let (mut health, health_service) = health_reporter();
    health
        .set_serving::<PostServiceServer<PostServiceImpl>>()
        .await;

    Server::builder()
        .add_service(health_service)
        .add_service(service)
        .serve_with_shutdown(addr, async move {
            // Wait for shutdown notification; ignore errors if sender dropped.
            let _ = shutdown.recv().await;
        })
        .await?;

    info!("gRPC server stopped");
    Ok(())
}
