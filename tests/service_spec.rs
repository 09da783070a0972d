use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use photostrip::models::*;
use photostrip::service::CollageService;
use photostrip::sink::{ImageSink, LocalDisk, RemoteObjectStore};
use photostrip::store::ImageStore;
use photostrip::Error;
use photostrip_core::{CollageError, Composer, ResizeFilter};
use speculate2::speculate;
use tokio_test::block_on;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf
}

fn memory_store() -> ImageStore {
    let store = ImageStore::open_memory().expect("Failed to create store");
    store.migrate().expect("Failed to migrate");
    store
}

/// A 30px service delivering to `media`, with exact nearest-neighbour scaling.
fn local_service(media: &std::path::Path) -> CollageService {
    CollageService::new(
        memory_store(),
        Composer::new(30).with_filter(ResizeFilter::Nearest),
        ImageSink::LocalDisk(LocalDisk::new(media, "http://localhost:3000")),
    )
}

/// Read back a collage delivered by the local sink.
fn delivered(media: &std::path::Path, delivery: &Delivery) -> RgbaImage {
    let file = delivery
        .url
        .rsplit('/')
        .next()
        .expect("URL has no file name");
    let bytes = std::fs::read(media.join(file)).expect("Collage file missing");
    image::load_from_memory(&bytes).unwrap().to_rgba8()
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let media = dir.path().join("media");
        let service = local_service(&media);
    }

    describe "ingest" {
        it "stores the image for the session" {
            let stored = block_on(service.ingest("alice", &png(4, 4, RED))).unwrap();

            let pending = service.pending("alice").unwrap();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].id, stored.id);
        }

        it "rejects undecodable bytes and keeps earlier images" {
            block_on(service.ingest("alice", &png(4, 4, RED))).unwrap();

            let err = block_on(service.ingest("alice", b"GIF89a but not really")).unwrap_err();
            assert!(matches!(err, Error::Collage(CollageError::Decode(_))));
            assert_eq!(service.pending("alice").unwrap().len(), 1);
        }
    }

    describe "confirm" {
        it "composes in arrival order, delivers and clears" {
            block_on(service.ingest("alice", &png(10, 10, RED))).unwrap();
            block_on(service.ingest("alice", &png(10, 10, GREEN))).unwrap();
            block_on(service.ingest("alice", &png(10, 10, BLUE))).unwrap();

            let decision = block_on(service.decide("alice", true)).unwrap();
            let delivery = match decision {
                Decision::Composed(delivery) => delivery,
                other => panic!("expected a collage, got {:?}", other),
            };

            assert_eq!(delivery.image_count, 3);
            assert_eq!(delivery.side_length, 30);
            assert!(delivery.url.starts_with("http://localhost:3000/media/collage-"));
            assert!(delivery.url.ends_with(".png"));

            let collage = delivered(&media, &delivery);
            assert_eq!(collage.dimensions(), (30, 30));
            assert_eq!(collage.get_pixel(15, 0), &Rgba(RED));
            assert_eq!(collage.get_pixel(15, 10), &Rgba(GREEN));
            assert_eq!(collage.get_pixel(15, 29), &Rgba(BLUE));

            assert!(service.pending("alice").unwrap().is_empty());
        }

        it "leaves other sessions alone" {
            block_on(service.ingest("alice", &png(10, 10, RED))).unwrap();
            block_on(service.ingest("bob", &png(10, 10, BLUE))).unwrap();

            block_on(service.confirm("alice")).unwrap();
            assert_eq!(service.pending("bob").unwrap().len(), 1);
        }

        it "reports nothing to compose for an empty session" {
            let err = block_on(service.decide("alice", true)).unwrap_err();
            assert!(matches!(err, Error::Collage(CollageError::EmptyInput)));
        }

        it "fails the second time once the session is cleared" {
            block_on(service.ingest("alice", &png(10, 10, RED))).unwrap();

            block_on(service.confirm("alice")).unwrap();
            let err = block_on(service.confirm("alice")).unwrap_err();
            assert!(matches!(err, Error::Collage(CollageError::EmptyInput)));
        }

        it "keeps pending images when delivery fails" {
            // Nothing listens on the discard port.
            let service = CollageService::new(
                memory_store(),
                Composer::new(30),
                ImageSink::RemoteObjectStore(RemoteObjectStore::new("http://127.0.0.1:9/bucket", None, None)),
            );
            block_on(service.ingest("alice", &png(10, 10, RED))).unwrap();

            let err = block_on(service.confirm("alice")).unwrap_err();
            assert!(matches!(err, Error::Http(_)));
            assert_eq!(service.pending("alice").unwrap().len(), 1);
        }
    }

    describe "decline" {
        it "discards pending images without composing" {
            block_on(service.ingest("alice", &png(10, 10, RED))).unwrap();
            block_on(service.ingest("alice", &png(10, 10, RED))).unwrap();

            let decision = block_on(service.decide("alice", false)).unwrap();
            assert!(matches!(decision, Decision::Declined { discarded: 2 }));
            assert!(service.pending("alice").unwrap().is_empty());
            assert!(!media.exists());
        }

        it "is harmless on an empty session" {
            let decision = block_on(service.decide("alice", false)).unwrap();
            assert!(matches!(decision, Decision::Declined { discarded: 0 }));
        }
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_confirms_produce_exactly_one_collage() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        let service = local_service(&media);

        for color in [RED, GREEN, BLUE] {
            service.ingest("alice", &png(10, 10, color)).await.unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.confirm("alice").await })
            })
            .collect();

        let mut composed = 0;
        let mut empty = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(delivery) => {
                    assert_eq!(delivery.image_count, 3);
                    composed += 1;
                }
                Err(Error::Collage(CollageError::EmptyInput)) => empty += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(composed, 1);
        assert_eq!(empty, 3);
        assert_eq!(std::fs::read_dir(&media).unwrap().count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn sessions_do_not_block_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let service = local_service(&dir.path().join("media"));

        service.ingest("alice", &png(10, 10, RED)).await.unwrap();
        service.ingest("bob", &png(10, 10, BLUE)).await.unwrap();

        let (alice, bob) = tokio::join!(service.confirm("alice"), service.confirm("bob"));
        assert_eq!(alice.unwrap().image_count, 1);
        assert_eq!(bob.unwrap().image_count, 1);
    }
}
