//! End-to-end session flow against a mock backend.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use vsearch_client::{ClientConfig, ClientError, HttpTransport, UploadFile};
use vsearch_models::{SearchOptions, UploadStatus};
use vsearch_session::{SessionConfig, VideoSession};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_for(server: &MockServer) -> VideoSession {
    let transport = HttpTransport::new(ClientConfig::with_origin(server.uri()).unwrap()).unwrap();
    let urls = transport.urls().clone();
    VideoSession::new(Arc::new(transport), urls, SessionConfig::default())
}

async fn mount_upload(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "success": true,
                    "message": "Video uploaded and processed successfully",
                    "video_id": "vid1",
                    "video_info": {
                        "video_id": "vid1",
                        "original_filename": "beach.mp4",
                        "duration": 42.0,
                        "fps": 30.0,
                        "width": 1280,
                        "height": 720,
                        "total_frames": 1260
                    },
                    "frames_extracted": 42
                }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_search_and_select() {
    let server = MockServer::start().await;
    mount_upload(&server, Duration::ZERO).await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "waves",
            "video_id": "vid1",
            "results": [
                {"frame_id": "f1", "video_id": "vid1", "timestamp": 10.0, "score": 0.61, "rank": 2, "thumbnail_url": "/frames/vid1/f1.jpg"},
                {"frame_id": "f2", "video_id": "vid1", "timestamp": 12.0, "score": 0.83, "rank": 1, "thumbnail_url": "/frames/vid1/f2.jpg"},
                {"frame_id": "f3", "video_id": "vid1", "timestamp": 35.0, "score": 0.40, "rank": 3, "thumbnail_url": "/frames/vid1/f3.jpg"}
            ],
            "total_results": 3
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/video-segment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "video_id": "vid1",
            "video_url": "/videos/vid1",
            "start_time": 6.0,
            "end_time": 16.0,
            "duration": 10.0,
            "center_timestamp": 11.0
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&progress);
    session.store().subscribe(move |state| {
        if state.is_uploading() {
            sink.lock().unwrap().push(state.upload_progress());
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("beach.mp4");
    std::fs::File::create(&file_path)
        .unwrap()
        .write_all(&vec![9u8; 300 * 1024])
        .unwrap();

    let video = session
        .start_upload(UploadFile::from_path(&file_path).await.unwrap())
        .await
        .unwrap();
    assert_eq!(video.id().as_str(), "vid1");
    assert_eq!(video.display_name(), "beach.mp4");

    let state = session.state();
    assert_eq!(state.upload_status(), UploadStatus::Succeeded);
    assert_eq!(state.upload_progress(), 100.0);
    let progress = progress.lock().unwrap().clone();
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    // Frames at 10s and 12s become overlapping 10s windows and merge.
    let segments = session.search("waves", SearchOptions::default()).await.unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].start_timestamp, 5.0);
    assert_eq!(segments[0].end_timestamp, 17.0);
    assert_eq!(segments[0].score, 0.83);
    assert_eq!(segments[0].thumbnail_ref, "/frames/vid1/f2.jpg");
    assert_eq!(segments[0].frame_count, 2);
    assert_eq!(segments[1].start_timestamp, 30.0);

    let selected = session.select_result(&segments[0]).await.unwrap();
    assert_eq!(selected.center_timestamp, Some(11.0));
    assert_eq!(
        session.video_url(selected.video_url.as_deref().unwrap()),
        format!("{}/api/videos/vid1", server.uri())
    );
    assert_eq!(
        session.frame_url(&segments[0].thumbnail_ref),
        format!("{}/frames/vid1/f2.jpg", server.uri())
    );
    assert_eq!(session.state().selected_segment, Some(selected));
}

#[tokio::test]
async fn test_cancelled_upload_leaves_previous_video() {
    let server = MockServer::start().await;
    mount_upload(&server, Duration::from_secs(5)).await;

    let session = session_for(&server);
    let previous = vsearch_models::VideoDescriptor::new("old", "old.mp4", 3.0, "/videos/old");
    session.open_video(previous.clone());

    let task = {
        let session = session.clone();
        tokio::spawn(async move {
            session
                .start_upload(UploadFile::from_bytes("beach.mp4", vec![1u8; 32 * 1024]))
                .await
        })
    };

    let mut rx = session.store().watch();
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.is_uploading()))
        .await
        .unwrap()
        .unwrap();

    assert!(session.cancel_upload());
    let state = session.state();
    assert_eq!(state.upload_status(), UploadStatus::Failed);
    assert_eq!(state.uploaded_video, Some(previous));

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(ClientError::Aborted)));
    assert!(!session.cancel_upload());
}

#[tokio::test]
async fn test_search_error_is_returned_not_stored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "detail": "No videos indexed. Please upload a video first."
        })))
        .mount(&server)
        .await;

    let session = session_for(&server);
    let err = session
        .search_all("anything", SearchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Server error (400): No videos indexed. Please upload a video first."
    );
    assert_eq!(session.state().revision, 0);
}
