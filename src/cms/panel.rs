//! Admin panel shell: the tab list and the collapsible sidebar.

use serde::Serialize;

use super::entity::Entity;
use crate::db::models::{
    Contact, Content, FaqItem, Feature, GalleryItem, LinkItem, Partner, Statistic, Testimonial,
    Theme,
};

/// Viewport width below which the sidebar starts collapsed.
pub const NARROW_BREAKPOINT: u32 = 768;
pub const COLLAPSED_WIDTH: u32 = 48;
pub const EXPANDED_WIDTH: u32 = 96;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    #[default]
    Content,
    Gallery,
    Theme,
    Contact,
    Features,
    Statistics,
    Faqs,
    Testimonials,
    Links,
    Partners,
}

impl AdminTab {
    /// Sidebar order.
    pub const ALL: [AdminTab; 10] = [
        AdminTab::Content,
        AdminTab::Gallery,
        AdminTab::Theme,
        AdminTab::Contact,
        AdminTab::Features,
        AdminTab::Statistics,
        AdminTab::Faqs,
        AdminTab::Testimonials,
        AdminTab::Links,
        AdminTab::Partners,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AdminTab::Content => "content",
            AdminTab::Gallery => "gallery",
            AdminTab::Theme => "theme",
            AdminTab::Contact => "contact",
            AdminTab::Features => "features",
            AdminTab::Statistics => "statistics",
            AdminTab::Faqs => "faqs",
            AdminTab::Testimonials => "testimonials",
            AdminTab::Links => "links",
            AdminTab::Partners => "partners",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AdminTab::Content => "Content",
            AdminTab::Gallery => "Gallery",
            AdminTab::Theme => "Theme",
            AdminTab::Contact => "Contact",
            AdminTab::Features => "Features",
            AdminTab::Statistics => "Statistics",
            AdminTab::Faqs => "FAQ",
            AdminTab::Testimonials => "Testimonials",
            AdminTab::Links => "Links",
            AdminTab::Partners => "Infrastructure Partners",
        }
    }

    /// Font Awesome icon name shown in the sidebar.
    pub fn glyph(self) -> &'static str {
        match self {
            AdminTab::Content => "file-alt",
            AdminTab::Gallery => "images",
            AdminTab::Theme => "palette",
            AdminTab::Contact => "phone",
            AdminTab::Features => "star",
            AdminTab::Statistics => "chart-bar",
            AdminTab::Faqs => "question-circle",
            AdminTab::Testimonials => "quote-right",
            AdminTab::Links => "link",
            AdminTab::Partners => "layer-group",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tab| tab.key() == key)
    }

    /// Storage folder for images uploaded from this tab's form, if the
    /// table has an image field.
    pub fn upload_folder(self) -> Option<&'static str> {
        match self {
            AdminTab::Content => Content::UPLOAD_FOLDER,
            AdminTab::Gallery => GalleryItem::UPLOAD_FOLDER,
            AdminTab::Theme => Theme::UPLOAD_FOLDER,
            AdminTab::Contact => Contact::UPLOAD_FOLDER,
            AdminTab::Features => Feature::UPLOAD_FOLDER,
            AdminTab::Statistics => Statistic::UPLOAD_FOLDER,
            AdminTab::Faqs => FaqItem::UPLOAD_FOLDER,
            AdminTab::Testimonials => Testimonial::UPLOAD_FOLDER,
            AdminTab::Links => LinkItem::UPLOAD_FOLDER,
            AdminTab::Partners => Partner::UPLOAD_FOLDER,
        }
    }
}

/// Serialized sidebar entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub key: &'static str,
    pub title: &'static str,
    pub glyph: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_folder: Option<&'static str>,
}

impl From<AdminTab> for TabInfo {
    fn from(tab: AdminTab) -> Self {
        Self {
            key: tab.key(),
            title: tab.title(),
            glyph: tab.glyph(),
            upload_folder: tab.upload_folder(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPanel {
    pub active: AdminTab,
    pub collapsed: bool,
}

impl AdminPanel {
    pub fn new(viewport_width: u32) -> Self {
        let mut panel = Self::default();
        panel.on_resize(viewport_width);
        panel
    }

    pub fn on_resize(&mut self, viewport_width: u32) {
        self.collapsed = viewport_width < NARROW_BREAKPOINT;
    }

    /// Switch tabs; on a narrow viewport an open sidebar folds away.
    pub fn select(&mut self, tab: AdminTab, viewport_width: u32) {
        self.active = tab;
        if viewport_width < NARROW_BREAKPOINT && !self.collapsed {
            self.collapsed = true;
        }
    }

    pub fn toggle(&mut self) {
        self.collapsed = !self.collapsed;
    }

    pub fn sidebar_width(&self) -> u32 {
        if self.collapsed {
            COLLAPSED_WIDTH
        } else {
            EXPANDED_WIDTH
        }
    }
}
