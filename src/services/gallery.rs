use std::sync::{Arc, Mutex, RwLock};

use super::{
    blob::StorageClient,
    pin_store::{PinStore, Subscription},
};
use crate::models::{
    gallery::{GalleryCategory, GalleryImage},
    pin::LocationPin,
};

/// Flattens every photo of every trip into the gallery list, in pin order then
/// trip order. Pure: equal input gives equal output.
pub fn project(pins: &[LocationPin]) -> Vec<GalleryImage> {
    pins.iter()
        .flat_map(|pin| {
            let category = GalleryCategory::from(pin.category);
            pin.all_photos().map(move |photo| GalleryImage {
                id: photo.id.clone(),
                url: photo.src.clone(),
                alt: photo.alt.clone(),
                title: photo.title.clone(),
                description: photo
                    .description
                    .clone()
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| pin.description.clone()),
                category,
                pin_id: pin.id.clone(),
            })
        })
        .collect()
}

/// `GalleryCategory::All` keeps everything.
pub fn filter_by_category(images: &[GalleryImage], category: GalleryCategory) -> Vec<GalleryImage> {
    if category == GalleryCategory::All {
        return images.to_vec();
    }
    images
        .iter()
        .filter(|image| image.category == category)
        .cloned()
        .collect()
}

pub fn images_for(pins: &[LocationPin], category: GalleryCategory) -> Vec<GalleryImage> {
    filter_by_category(&project(pins), category)
}

/// Re-projects on every publish and hands the result to `callback`.
pub fn subscribe_gallery<F>(store: &PinStore, callback: F) -> Subscription
where
    F: Fn(&[GalleryImage]) + Send + Sync + 'static,
{
    store.subscribe(move |pins| callback(&project(pins)))
}

/// Rewrites blob-store keys to their public URLs.
fn with_public_urls(mut images: Vec<GalleryImage>, urls: &StorageClient) -> Vec<GalleryImage> {
    for image in &mut images {
        image.url = urls.photo_url(&image.url);
    }
    images
}

/// Gallery list kept current by a pin store subscription.
pub struct GalleryFeed {
    images: Arc<RwLock<Vec<GalleryImage>>>,
    urls: StorageClient,
    subscription: Mutex<Option<Subscription>>,
}

impl GalleryFeed {
    pub fn attach(store: &PinStore, urls: StorageClient) -> Self {
        let images = Arc::new(RwLock::new(with_public_urls(
            project(&store.snapshot()),
            &urls,
        )));
        let sink = Arc::clone(&images);
        let sink_urls = urls.clone();
        let subscription = subscribe_gallery(store, move |projected| {
            if let Ok(mut images) = sink.write() {
                *images = with_public_urls(projected.to_vec(), &sink_urls);
            }
        });
        Self {
            images,
            urls,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn images(&self, category: GalleryCategory) -> Vec<GalleryImage> {
        self.images
            .read()
            .map(|images| filter_by_category(&images, category))
            .unwrap_or_default()
    }

    /// Replaces the current list, e.g. after a read that did not publish.
    pub fn refresh(&self, pins: &[LocationPin]) {
        if let Ok(mut images) = self.images.write() {
            *images = with_public_urls(project(pins), &self.urls);
        }
    }

    pub fn detach(&self) -> bool {
        self.subscription
            .lock()
            .ok()
            .and_then(|mut slot| slot.take())
            .is_some_and(Subscription::unsubscribe)
    }
}
