/*!
 * Site Module
 * Public page payloads: home sections, gallery, contact and metadata
 */
pub mod icons;
pub mod maps;
pub mod metadata;

use serde::Serialize;
use std::sync::Arc;

use crate::backend::Backend;
use crate::cms::{Entity, TableManager};
use crate::db::models::{
    Contact, Content, FaqItem, Feature, GalleryItem, LinkItem, Partner, Statistic, Testimonial,
};
use crate::error::AppError;
use icons::IconRef;
use maps::{embed_map_url, DEFAULT_EMBED_URL};

/// Rows that carry a free-form icon name.
pub trait HasIcon {
    fn icon(&self) -> Option<&str>;
}

impl HasIcon for Feature {
    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

impl HasIcon for Statistic {
    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

impl HasIcon for LinkItem {
    fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }
}

/// A row together with its resolved icon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithIcon<T> {
    #[serde(flatten)]
    pub item: T,
    pub icon_ref: IconRef,
}

impl<T: HasIcon> From<T> for WithIcon<T> {
    fn from(item: T) -> Self {
        let icon_ref = IconRef::resolve(item.icon());
        Self { item, icon_ref }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomePage {
    pub contents: Vec<Content>,
    pub features: Vec<WithIcon<Feature>>,
    pub statistics: Vec<WithIcon<Statistic>>,
    pub faqs: Vec<FaqItem>,
    pub testimonials: Vec<Testimonial>,
    pub links: Vec<WithIcon<LinkItem>>,
    pub partners: Vec<Partner>,
}

/// One home-page section; a failure only empties that section.
async fn section<E: Entity>(backend: &Arc<dyn Backend>) -> Vec<E> {
    match TableManager::<E>::new(Arc::clone(backend)).list().await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(table = E::TABLE, "Section failed to load: {}", e);
            Vec::new()
        }
    }
}

fn with_icons<T: HasIcon>(rows: Vec<T>) -> Vec<WithIcon<T>> {
    rows.into_iter().map(WithIcon::from).collect()
}

pub async fn home_page(backend: Arc<dyn Backend>) -> HomePage {
    let (contents, features, statistics, faqs, testimonials, links, partners) = tokio::join!(
        section::<Content>(&backend),
        section::<Feature>(&backend),
        section::<Statistic>(&backend),
        section::<FaqItem>(&backend),
        section::<Testimonial>(&backend),
        section::<LinkItem>(&backend),
        section::<Partner>(&backend),
    );

    HomePage {
        contents,
        features: with_icons(features),
        statistics: with_icons(statistics),
        faqs,
        testimonials,
        links: with_icons(links),
        partners,
    }
}

pub async fn gallery(backend: Arc<dyn Backend>) -> Result<Vec<GalleryItem>, AppError> {
    TableManager::<GalleryItem>::new(backend).list().await
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPage {
    pub contact: Option<Contact>,
    /// Embeddable map for the iframe; a default location when none is set.
    pub map_embed_url: String,
}

/// Latest contact record with its map URL normalised.
pub async fn contact_page(backend: Arc<dyn Backend>) -> Result<ContactPage, AppError> {
    let contact = TableManager::<Contact>::new(backend)
        .latest()
        .await?
        .map(|mut contact| {
            contact.map_url = contact
                .map_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(embed_map_url);
            contact
        });

    let map_embed_url = contact
        .as_ref()
        .and_then(|c| c.map_url.clone())
        .unwrap_or_else(|| DEFAULT_EMBED_URL.to_string());

    Ok(ContactPage {
        contact,
        map_embed_url,
    })
}
