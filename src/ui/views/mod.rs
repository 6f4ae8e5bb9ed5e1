mod brief_detail;
mod brief_list;
mod contact_history;
mod contact_list;
mod dashboard;
mod meeting_detail;
mod meeting_list;
mod settings;

pub use brief_detail::BriefDetailView;
pub use brief_list::BriefListView;
pub use contact_history::ContactHistoryView;
pub use contact_list::ContactListView;
pub use dashboard::DashboardView;
pub use meeting_detail::MeetingDetailView;
pub use meeting_list::MeetingListView;
pub use settings::SettingsView;
