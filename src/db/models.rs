//! Database Models - rows of the content tables and the forms that edit them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::backend::{OrderBy, Row};
use crate::cms::entity::{require, Entity, FollowUp};
use crate::error::AppError;
use crate::site::maps::embed_map_url;
use crate::theme::{ACTIVATE_THEME_FN, DEFAULT_COLORS};

// ============================================================================
// Content (hero / about copy)
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContentForm {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

impl Entity for Content {
    type Form = ContentForm;

    const TABLE: &'static str = "contents";
    const KEY: &'static str = "content";
    const ORDER: OrderBy = OrderBy::desc("created_at");
    const UPLOAD_FOLDER: Option<&'static str> = Some("uploads");

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &ContentForm) -> Result<(), AppError> {
        require(&[&form.title], "Title is required!")
    }

    fn to_form(&self) -> ContentForm {
        ContentForm {
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            image_url: self.image_url.clone().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Gallery
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryItem {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GalleryForm {
    pub title: String,
    pub image_url: String,
    pub description: String,
    pub date: Option<NaiveDate>,
}

impl Entity for GalleryItem {
    type Form = GalleryForm;

    const TABLE: &'static str = "gallery";
    const KEY: &'static str = "gallery";
    const ORDER: OrderBy = OrderBy::desc("date");
    const UPLOAD_FOLDER: Option<&'static str> = Some("gallery");

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &GalleryForm) -> Result<(), AppError> {
        require(&[&form.title, &form.image_url], "Title and image are required!")
    }

    fn to_form(&self) -> GalleryForm {
        GalleryForm {
            title: self.title.clone(),
            image_url: self.image_url.clone(),
            description: self.description.clone().unwrap_or_default(),
            date: self.date,
        }
    }
}

// ============================================================================
// Contact
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub email: String,
    #[serde(default)]
    pub map_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContactForm {
    pub address: String,
    pub phone: String,
    pub email: String,
    pub map_url: String,
}

impl Entity for Contact {
    type Form = ContactForm;

    const TABLE: &'static str = "contacts";
    const KEY: &'static str = "contact";
    const ORDER: OrderBy = OrderBy::desc("created_at");

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &ContactForm) -> Result<(), AppError> {
        require(&[&form.email], "Email is required!")
    }

    fn to_form(&self) -> ContactForm {
        ContactForm {
            address: self.address.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
            email: self.email.clone(),
            map_url: self.map_url.clone().unwrap_or_default(),
        }
    }

    fn prepare(form: &mut ContactForm) {
        form.map_url = embed_map_url(form.map_url.trim());
    }
}

// ============================================================================
// Order-indexed sections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureForm {
    pub title: String,
    pub description: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

impl Entity for Feature {
    type Form = FeatureForm;

    const TABLE: &'static str = "features";
    const KEY: &'static str = "features";
    const ORDER: OrderBy = OrderBy::asc("order_index");
    const ORDER_INDEXED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &FeatureForm) -> Result<(), AppError> {
        require(&[&form.title], "Title is required!")
    }

    fn to_form(&self) -> FeatureForm {
        FeatureForm {
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            icon: self.icon.clone().unwrap_or_default(),
            order_index: Some(self.order_index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Statistic {
    pub id: Uuid,
    pub label: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatisticForm {
    pub label: String,
    pub value: f64,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

impl Entity for Statistic {
    type Form = StatisticForm;

    const TABLE: &'static str = "statistics";
    const KEY: &'static str = "statistics";
    const ORDER: OrderBy = OrderBy::asc("order_index");
    const ORDER_INDEXED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &StatisticForm) -> Result<(), AppError> {
        require(&[&form.label], "Label is required!")
    }

    fn to_form(&self) -> StatisticForm {
        StatisticForm {
            label: self.label.clone(),
            value: self.value,
            icon: self.icon.clone().unwrap_or_default(),
            order_index: Some(self.order_index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FaqItem {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaqForm {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

impl Entity for FaqItem {
    type Form = FaqForm;

    const TABLE: &'static str = "faqs";
    const KEY: &'static str = "faqs";
    const ORDER: OrderBy = OrderBy::asc("order_index");
    const ORDER_INDEXED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &FaqForm) -> Result<(), AppError> {
        require(
            &[&form.question, &form.answer],
            "Question and answer are required!",
        )
    }

    fn to_form(&self) -> FaqForm {
        FaqForm {
            question: self.question.clone(),
            answer: self.answer.clone(),
            order_index: Some(self.order_index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Testimonial {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub content: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestimonialForm {
    pub name: String,
    pub company: String,
    pub content: String,
    pub avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

impl Entity for Testimonial {
    type Form = TestimonialForm;

    const TABLE: &'static str = "testimonials";
    const KEY: &'static str = "testimonials";
    const ORDER: OrderBy = OrderBy::asc("order_index");
    const ORDER_INDEXED: bool = true;
    const UPLOAD_FOLDER: Option<&'static str> = Some("testimonials");

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &TestimonialForm) -> Result<(), AppError> {
        require(&[&form.name, &form.content], "Name and content are required!")
    }

    fn to_form(&self) -> TestimonialForm {
        TestimonialForm {
            name: self.name.clone(),
            company: self.company.clone().unwrap_or_default(),
            content: self.content.clone(),
            avatar_url: self.avatar_url.clone().unwrap_or_default(),
            order_index: Some(self.order_index),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkItem {
    pub id: Uuid,
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinkForm {
    pub label: String,
    pub url: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i32>,
}

impl Entity for LinkItem {
    type Form = LinkForm;

    const TABLE: &'static str = "links";
    const KEY: &'static str = "links";
    const ORDER: OrderBy = OrderBy::asc("order_index");
    const ORDER_INDEXED: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &LinkForm) -> Result<(), AppError> {
        require(&[&form.label, &form.url], "Label and URL are required!")
    }

    fn to_form(&self) -> LinkForm {
        LinkForm {
            label: self.label.clone(),
            url: self.url.clone(),
            icon: self.icon.clone().unwrap_or_default(),
            order_index: Some(self.order_index),
        }
    }
}

// ============================================================================
// Partners
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Partner {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub website_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PartnerForm {
    pub name: String,
    pub logo_url: String,
    pub website_url: String,
}

impl Entity for Partner {
    type Form = PartnerForm;

    const TABLE: &'static str = "partners";
    const KEY: &'static str = "partners";
    const ORDER: OrderBy = OrderBy::desc("created_at");
    const UPLOAD_FOLDER: Option<&'static str> = Some("partners");

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &PartnerForm) -> Result<(), AppError> {
        require(&[&form.name], "Partner name is required!")
    }

    fn to_form(&self) -> PartnerForm {
        PartnerForm {
            name: self.name.clone(),
            logo_url: self.logo_url.clone().unwrap_or_default(),
            website_url: self.website_url.clone().unwrap_or_default(),
        }
    }
}

// ============================================================================
// Themes
// ============================================================================

/// The nine named colours of a theme. Empty strings count as unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeColors {
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub success_color: Option<String>,
    pub danger_color: Option<String>,
    pub warning_color: Option<String>,
    pub info_color: Option<String>,
    pub light_color: Option<String>,
    pub dark_color: Option<String>,
    pub muted_color: Option<String>,
}

impl ThemeColors {
    /// Colour names in the order they are rendered.
    pub const COLOR_KEYS: [&'static str; 9] = [
        "primary",
        "secondary",
        "success",
        "danger",
        "warning",
        "info",
        "light",
        "dark",
        "muted",
    ];

    fn slot(&self, name: &str) -> Option<&Option<String>> {
        Some(match name {
            "primary" => &self.primary_color,
            "secondary" => &self.secondary_color,
            "success" => &self.success_color,
            "danger" => &self.danger_color,
            "warning" => &self.warning_color,
            "info" => &self.info_color,
            "light" => &self.light_color,
            "dark" => &self.dark_color,
            "muted" => &self.muted_color,
            _ => return None,
        })
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "primary" => &mut self.primary_color,
            "secondary" => &mut self.secondary_color,
            "success" => &mut self.success_color,
            "danger" => &mut self.danger_color,
            "warning" => &mut self.warning_color,
            "info" => &mut self.info_color,
            "light" => &mut self.light_color,
            "dark" => &mut self.dark_color,
            "muted" => &mut self.muted_color,
            _ => return None,
        })
    }

    /// The colour stored under `name`, if it is set to something non-blank.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.slot(name)
            .and_then(|value| value.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Fill every unset colour with its default.
    pub fn with_defaults(mut self) -> Self {
        for (name, default) in DEFAULT_COLORS {
            if self.get(name).is_none() {
                if let Some(slot) = self.slot_mut(name) {
                    *slot = Some(default.to_string());
                }
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub id: Uuid,
    pub description: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(flatten)]
    pub colors: ThemeColors,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Theme edit form. `is_active` is never written with the row; activation
/// goes through the `activate_theme` procedure instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThemeForm {
    pub description: String,
    pub company_name: String,
    pub font: String,
    pub logo_url: String,
    #[serde(flatten)]
    pub colors: ThemeColors,
    #[serde(skip_serializing)]
    pub is_active: bool,
}

impl Entity for Theme {
    type Form = ThemeForm;

    const TABLE: &'static str = "themes";
    const KEY: &'static str = "theme";
    const ORDER: OrderBy = OrderBy::desc("created_at");
    const UPLOAD_FOLDER: Option<&'static str> = Some("themes");
    const REFRESHES_THEME: bool = true;

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(form: &ThemeForm) -> Result<(), AppError> {
        require(&[&form.description], "Short description is required!")
    }

    fn to_form(&self) -> ThemeForm {
        ThemeForm {
            description: self.description.clone(),
            company_name: self.company_name.clone().unwrap_or_default(),
            font: self.font.clone().unwrap_or_default(),
            logo_url: self.logo_url.clone().unwrap_or_default(),
            colors: self.colors.clone(),
            is_active: self.is_active,
        }
    }

    fn prepare(form: &mut ThemeForm) {
        form.colors = std::mem::take(&mut form.colors).with_defaults();
    }

    fn follow_up(saved: &Theme, form: &ThemeForm) -> Option<FollowUp> {
        if form.is_active {
            Some(FollowUp::Rpc {
                function: ACTIVATE_THEME_FN,
                args: json!({ "theme_id": saved.id }),
            })
        } else if saved.is_active {
            let mut patch = Row::new();
            patch.insert("is_active".to_string(), json!(false));
            Some(FollowUp::Patch(patch))
        } else {
            None
        }
    }
}
