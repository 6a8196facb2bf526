pub mod archive_list;
pub mod help_overlay;
pub mod metadata_modal;
pub mod status_panel;
