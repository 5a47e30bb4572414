pub mod billing;
pub mod health;
pub mod leads;
pub mod onboarding;
pub mod session;
pub mod track;
pub mod webhooks;
