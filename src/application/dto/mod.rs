/// Data Transfer Objects for application layer
///
/// DTOs are used to transfer data between the application layer
/// and adapters, keeping the domain layer isolated.
mod remediation_report;
mod remediation_request;
mod selection_strategy;

pub use remediation_report::RemediationReport;
pub use remediation_request::RemediationRequest;
pub use selection_strategy::SelectionStrategy;
