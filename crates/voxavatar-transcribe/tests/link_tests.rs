//! Transcription link integration tests against a local WebSocket peer.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use voxavatar_transcribe::{AudioPayload, LinkConfig, TranscriptEvent, TranscriptionLink};

async fn recv_event(rx: &mut mpsc::Receiver<TranscriptEvent>) -> TranscriptEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for transcript event")
        .expect("transcript channel closed")
}

#[tokio::test]
async fn segment_round_trips_to_a_transcript() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Binary(bytes) => {
                    assert_eq!(bytes.as_ref(), &[1u8, 2, 3][..]);
                    ws.send(Message::Text(r#"{"text":"hello there"}"#.into()))
                        .await
                        .unwrap();
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let (payload_tx, payload_rx) = mpsc::channel(8);
    let (transcript_tx, mut transcript_rx) = mpsc::channel(8);
    let link = TranscriptionLink::spawn(
        LinkConfig {
            url: format!("ws://{}", addr),
        },
        payload_rx,
        transcript_tx,
    );

    payload_tx
        .send(AudioPayload {
            segment_id: 1,
            bytes: vec![1, 2, 3],
        })
        .await
        .unwrap();

    let event = recv_event(&mut transcript_rx).await;
    assert_eq!(
        event,
        TranscriptEvent::Transcription {
            text: "hello there".to_string()
        }
    );

    drop(payload_tx);
    let _ = link.await;
    let _ = server.await;
}

#[tokio::test]
async fn service_errors_are_forwarded_not_retried() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();
        ws.send(Message::Text(r#"{"message":"decode failure"}"#.into()))
            .await
            .unwrap();
        // Then a good transcript to prove the link kept going.
        ws.send(Message::Text(r#"{"text":"still alive"}"#.into()))
            .await
            .unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    let (payload_tx, payload_rx) = mpsc::channel(8);
    let (transcript_tx, mut transcript_rx) = mpsc::channel(8);
    let link = TranscriptionLink::spawn(
        LinkConfig {
            url: format!("ws://{}", addr),
        },
        payload_rx,
        transcript_tx,
    );

    assert_eq!(
        recv_event(&mut transcript_rx).await,
        TranscriptEvent::Error {
            message: "decode failure".to_string()
        }
    );
    assert_eq!(
        recv_event(&mut transcript_rx).await,
        TranscriptEvent::Transcription {
            text: "still alive".to_string()
        }
    );

    drop(payload_tx);
    let _ = link.await;
    let _ = server.await;
}

#[tokio::test]
async fn dead_link_keeps_draining_payloads() {
    // Nothing is listening on this port; the connect fails and the link
    // must still consume payloads so the pipeline never backs up.
    let (payload_tx, payload_rx) = mpsc::channel(8);
    let (transcript_tx, _transcript_rx) = mpsc::channel(8);
    let link = TranscriptionLink::spawn(
        LinkConfig {
            url: "ws://127.0.0.1:1".to_string(),
        },
        payload_rx,
        transcript_tx,
    );

    for i in 0..16u64 {
        tokio::time::timeout(
            Duration::from_secs(5),
            payload_tx.send(AudioPayload {
                segment_id: i,
                bytes: vec![0; 8],
            }),
        )
        .await
        .expect("send should not block on a dead link")
        .unwrap();
    }

    drop(payload_tx);
    let _ = link.await;
}
