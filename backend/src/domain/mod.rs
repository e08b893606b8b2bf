//! Domain services. Each service owns one slice of the data model and is
//! cheap to clone; handlers pick identities apart and delegate here.

pub mod checkin_service;
pub mod child_service;
pub mod chore_service;
pub mod models;
pub mod notification_service;
pub mod payday_service;
pub mod review_service;
pub mod week;

pub use checkin_service::CheckInService;
pub use child_service::ChildService;
pub use chore_service::ChoreService;
pub use notification_service::NotificationService;
pub use payday_service::PaydayService;
pub use review_service::ReviewService;
