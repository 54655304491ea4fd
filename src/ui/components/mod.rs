pub mod menu;
pub mod progress_bar;
pub mod recovery_status;
pub mod section_view;
pub mod writing_pad;
