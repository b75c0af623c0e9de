pub mod booking;
pub mod ledger;
pub mod lifecycle;
pub mod meeting;
pub mod notifier;
pub mod payment;
pub mod reconciler;
pub mod slots;
pub mod supabase_ledger;

pub use booking::AppointmentBookingService;
pub use ledger::{AppointmentLedger, InMemoryAppointmentLedger, LedgerError};
pub use lifecycle::AppointmentLifecycleService;
pub use meeting::{JitsiMeetingLinks, MeetingLinkGenerator};
pub use notifier::{LogNotifier, NotificationError, Notifier};
pub use payment::{HttpPaymentGateway, PaymentError, PaymentGateway, SandboxPaymentGateway};
pub use reconciler::reconcile;
pub use slots::{BookableDay, OccupiedDay, SlotPipeline};
pub use supabase_ledger::SupabaseAppointmentLedger;
