/*!
 * CMS Module
 * Generic table manager, admin view-model, upload helper and panel shell
 */
pub mod entity;
pub mod manager;
pub mod panel;
pub mod upload;
pub mod view;

pub use entity::{Entity, FollowUp};
pub use manager::TableManager;
pub use panel::{AdminPanel, AdminTab};
pub use upload::ImageUploader;
pub use view::ManagerView;
