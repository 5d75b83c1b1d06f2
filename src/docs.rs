use crate::api::anomaly::{AnomalyFilter, AnomalyListResponse, TreatResponse};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery};
use crate::api::leave::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::punch::{CreatePunch, PunchFilter, PunchListResponse};
use crate::api::reconcile::RunReconciliation;
use crate::api::report::{EmployeeSummary, SummaryQuery, SummaryResponse};
use crate::api::shift::{CreateShift, ShiftFilter, ShiftListResponse};
use crate::model::anomaly::{Anomaly, AnomalyKind, AnomalyStatus, Severity};
use crate::model::employee::Employee;
use crate::model::leave::{Leave, LeaveStatus, LeaveType};
use crate::model::punch::{Punch, PunchKind};
use crate::model::shift::{Segment, Shift, ShiftKind};
use crate::recon::aggregate::EmployeeTotals;
use crate::recon::engine::ReconOutcome;
use crate::recon::lifecycle::{CorrectionPayload, TreatRequest};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pointage Reconciliation API",
        version = "1.0.0",
        description = r#"
## Shift-vs-Punch Reconciliation

Backend for restaurant workforce management: planned shifts, clock-in/out
("pointage") events, leave ("congé") requests, and the anomaly engine that
reconciles planned segments against actual punches.

### Key Features
- **Shift Planning**
  - Create and list planned shifts with multi-segment days and extra segments
- **Punch Ingestion**
  - Badge events normalized from legacy encodings at the storage boundary
- **Leave Management**
  - Request, approve and reject congés; approved leave feeds the reconciler
- **Anomaly Reconciliation**
  - Batch passes classify lateness, early departure, missing punches,
    out-of-window punches, overtime, and absence conflicts
- **Review Workflow**
  - `valider` / `refuser` / `corriger` with punctuality scoring and audit
- **Reporting**
  - Per-employee hour and absence totals, net of extra segments

### Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,

        crate::api::shift::create_shift,
        crate::api::shift::get_shift,
        crate::api::shift::list_shifts,

        crate::api::punch::create_punch,
        crate::api::punch::list_punches,

        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::create_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,

        crate::api::anomaly::list_anomalies,
        crate::api::anomaly::get_anomaly,
        crate::api::anomaly::treat_anomaly,

        crate::api::reconcile::run,

        crate::api::report::summary
    ),
    components(
        schemas(
            Employee,
            CreateEmployee,
            EmployeeQuery,
            EmployeeListResponse,
            Shift,
            Segment,
            ShiftKind,
            CreateShift,
            ShiftFilter,
            ShiftListResponse,
            Punch,
            PunchKind,
            CreatePunch,
            PunchFilter,
            PunchListResponse,
            Leave,
            LeaveType,
            LeaveStatus,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            Anomaly,
            AnomalyKind,
            AnomalyStatus,
            Severity,
            AnomalyFilter,
            AnomalyListResponse,
            TreatRequest,
            TreatResponse,
            CorrectionPayload,
            RunReconciliation,
            ReconOutcome,
            SummaryQuery,
            SummaryResponse,
            EmployeeSummary,
            EmployeeTotals
        )
    ),
    tags(
        (name = "Employee", description = "Employee directory APIs"),
        (name = "Shift", description = "Shift planning APIs"),
        (name = "Punch", description = "Pointage ingestion APIs"),
        (name = "Leave", description = "Congé management APIs"),
        (name = "Anomaly", description = "Anomaly review workflow APIs"),
        (name = "Reconciliation", description = "Batch reconciliation APIs"),
        (name = "Report", description = "Reporting aggregate APIs"),
    )
)]
pub struct ApiDoc;
