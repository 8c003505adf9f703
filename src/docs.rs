use crate::api::attendance::{
    AbsenceDetailsReq, AttendanceListResponse, AuditResponse, DashboardSummary, SelectionMode,
};
use crate::api::device::{TapReq, UnregisteredUid};
use crate::api::employee::{CreateEmployee, UpdateEmployee};
use crate::api::holiday::CreateHoliday;
use crate::api::import::ImportSummary;
use crate::api::working_hours::AutocekReq;
use crate::attendance::aggregator::StatusCount;
use crate::attendance::classifier::StatusMismatch;
use crate::auth::handlers::LoginResponse;
use crate::model::attendance::{AttendanceRecord, AttendanceRow};
use crate::model::employee::{Employee, EmployeeStatus, Gender, Position};
use crate::model::holiday::Holiday;
use crate::model::working_hours::{TimeWindow, WorkingHours};
use crate::models::LoginReqDto;
use crate::utils::auto_absence::AbsenceSweep;
use crate::utils::photo_cache::PhotoDirection;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Absensi RFID API",
        version = "1.0.0",
        description = r#"
## RFID Attendance Dashboard

Administrative backend for an RFID attendance system. A card reader records
check-ins and check-outs; this API lets administrators review and export them.

### 🔹 Key Features
- **Attendance**
  - Daily, date-range and monthly views with search
  - Absence annotations, label audit and on-demand absence sweep
- **Employees**
  - Register unassigned cards, edit profiles (including card moves), delete
- **Working hours and holidays**
  - Check-in / check-out windows, automatic absence time, holiday calendar
- **Reports**
  - Printable PDF attendance reports

### 🔐 Security
All `/api` endpoints need a **JWT Bearer** access token.
Viewers can read and export; only **Admin** can change data.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::session,

        crate::api::attendance::list_attendance,
        crate::api::attendance::update_absence_details,
        crate::api::attendance::audit_day,
        crate::api::attendance::photo_url,
        crate::api::attendance::run_auto_absence,
        crate::api::attendance::dashboard,

        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::create_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::list_positions,

        crate::api::holiday::list_holidays,
        crate::api::holiday::create_holiday,
        crate::api::holiday::delete_holiday,

        crate::api::working_hours::get_working_hours,
        crate::api::working_hours::save_check_in,
        crate::api::working_hours::save_check_out,
        crate::api::working_hours::save_autocek,

        crate::api::device::list_unregistered,
        crate::api::device::register_tap,
        crate::api::device::discard_unregistered,

        crate::api::report::attendance_report,
        crate::api::import::import_legacy
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            SelectionMode,
            AttendanceRecord,
            AttendanceRow,
            AttendanceListResponse,
            AbsenceDetailsReq,
            AuditResponse,
            StatusMismatch,
            StatusCount,
            DashboardSummary,
            AbsenceSweep,
            PhotoDirection,
            Employee,
            Gender,
            Position,
            EmployeeStatus,
            CreateEmployee,
            UpdateEmployee,
            Holiday,
            CreateHoliday,
            TimeWindow,
            WorkingHours,
            AutocekReq,
            UnregisteredUid,
            TapReq,
            ImportSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in and token rotation"),
        (name = "Attendance", description = "Attendance review APIs"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Holiday", description = "Holiday calendar"),
        (name = "Working Hours", description = "Check-in and check-out windows"),
        (name = "Device", description = "Cards tapped but not yet registered"),
        (name = "Report", description = "Printable reports"),
        (name = "Import", description = "Legacy data import"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_protected_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/attendance"));
        assert!(doc.paths.paths.contains_key("/api/reports/attendance"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
