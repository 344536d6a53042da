//! The record kinds shown on the staff list pages.

use std::cmp::Ordering;

use crate::column::{ColumnSpec, Columns};
use crate::domain::{AdmError, ConfigError};
use crate::record::{Field, FieldKind, ListRecord, Record, Value};
use crate::source::RawRow;

macro_rules! record_fields {
    (@kind) => {
        FieldKind::Primitive
    };
    (@kind nested) => {
        FieldKind::Nested
    };
    ($name:ident { $($variant:ident => $label:literal $(: $kind:ident)?),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Field for $name {
            fn all() -> &'static [Self] {
                &[$($name::$variant),+]
            }

            fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn kind(self) -> FieldKind {
                match self {
                    $($name::$variant => record_fields!(@kind $($kind)?)),+
                }
            }
        }
    };
}

/// Missing values last, whatever the direction of the caller.
fn compare_optional_str(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------- applicants

#[derive(Debug, Clone, PartialEq)]
pub struct ExamCenterRef {
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Applicant {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution: Option<String>,
    pub exam_center: Option<ExamCenterRef>,
    pub approved: bool,
    pub score: Option<f64>,
}

record_fields!(ApplicantField {
    Id => "id",
    Name => "name",
    Email => "email",
    Phone => "phone",
    Institution => "institution",
    ExamCenter => "examCenter": nested,
    Approved => "approved",
    Score => "score",
});

fn by_exam_center_name(a: &Applicant, b: &Applicant) -> Ordering {
    compare_optional_str(
        a.exam_center.as_ref().map(|c| c.name.as_str()),
        b.exam_center.as_ref().map(|c| c.name.as_str()),
    )
}

impl Record for Applicant {
    type Field = ApplicantField;

    fn value(&self, field: ApplicantField) -> Value {
        match field {
            ApplicantField::Id => Value::from(&self.id),
            ApplicantField::Name => Value::from(&self.name),
            ApplicantField::Email => Value::from(&self.email),
            ApplicantField::Phone => Value::from(self.phone.as_ref()),
            ApplicantField::Institution => Value::from(self.institution.as_ref()),
            ApplicantField::ExamCenter => match &self.exam_center {
                Some(center) => Value::Nested(vec![
                    ("name", Value::from(&center.name)),
                    ("code", Value::from(center.code.as_ref())),
                ]),
                None => Value::Missing,
            },
            ApplicantField::Approved => Value::Bool(self.approved),
            ApplicantField::Score => Value::from(self.score),
        }
    }
}

impl ListRecord for Applicant {
    const TITLE: &'static str = "Applicants";

    fn from_row(row: &RawRow<'_>) -> Result<Self, AdmError> {
        let exam_center = row.string("examCenter.name").map(|name| ExamCenterRef {
            name,
            code: row.string("examCenter.code"),
        });
        Ok(Self {
            id: row.required("id")?,
            name: row.required("name")?,
            email: row.required("email")?,
            phone: row.string("phone"),
            institution: row.string("institution"),
            exam_center,
            approved: row.flag("approved")?.unwrap_or(false),
            score: row.float("score")?,
        })
    }

    fn columns() -> Result<Columns<Self>, ConfigError> {
        Columns::new(
            vec![
                ColumnSpec::new(ApplicantField::Name, "Name"),
                ColumnSpec::new(ApplicantField::Email, "Email"),
                ColumnSpec::new(ApplicantField::Phone, "Phone"),
                ColumnSpec::new(ApplicantField::Institution, "Institution"),
                ColumnSpec::new(ApplicantField::ExamCenter, "Exam center")
                    .sort_with(by_exam_center_name),
                ColumnSpec::new(ApplicantField::Approved, "Approved").without_filter(),
                ColumnSpec::new(ApplicantField::Score, "Score"),
            ],
            ApplicantField::Name,
        )
    }
}

// -------------------------------------------------------------- institutions

#[derive(Debug, Clone, PartialEq)]
pub struct Institution {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub city: Option<String>,
    pub email: Option<String>,
}

record_fields!(InstitutionField {
    Id => "id",
    Name => "name",
    Code => "code",
    City => "city",
    Email => "email",
});

impl Record for Institution {
    type Field = InstitutionField;

    fn value(&self, field: InstitutionField) -> Value {
        match field {
            InstitutionField::Id => Value::from(&self.id),
            InstitutionField::Name => Value::from(&self.name),
            InstitutionField::Code => Value::from(self.code.as_ref()),
            InstitutionField::City => Value::from(self.city.as_ref()),
            InstitutionField::Email => Value::from(self.email.as_ref()),
        }
    }
}

impl ListRecord for Institution {
    const TITLE: &'static str = "Institutions";

    fn from_row(row: &RawRow<'_>) -> Result<Self, AdmError> {
        Ok(Self {
            id: row.required("id")?,
            name: row.required("name")?,
            code: row.string("code"),
            city: row.string("city"),
            email: row.string("email"),
        })
    }

    fn columns() -> Result<Columns<Self>, ConfigError> {
        Columns::new(
            vec![
                ColumnSpec::new(InstitutionField::Name, "Name"),
                ColumnSpec::new(InstitutionField::Code, "Code"),
                ColumnSpec::new(InstitutionField::City, "City"),
                ColumnSpec::new(InstitutionField::Email, "Email"),
            ],
            InstitutionField::Name,
        )
    }
}

// -------------------------------------------------------------- exam centers

#[derive(Debug, Clone, PartialEq)]
pub struct ExamCenter {
    pub id: String,
    pub name: String,
    pub code: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i64>,
    pub operator: Option<String>,
}

record_fields!(ExamCenterField {
    Id => "id",
    Name => "name",
    Code => "code",
    Address => "address",
    Capacity => "capacity",
    Operator => "operator",
});

impl Record for ExamCenter {
    type Field = ExamCenterField;

    fn value(&self, field: ExamCenterField) -> Value {
        match field {
            ExamCenterField::Id => Value::from(&self.id),
            ExamCenterField::Name => Value::from(&self.name),
            ExamCenterField::Code => Value::from(self.code.as_ref()),
            ExamCenterField::Address => Value::from(self.address.as_ref()),
            ExamCenterField::Capacity => Value::from(self.capacity),
            ExamCenterField::Operator => Value::from(self.operator.as_ref()),
        }
    }
}

impl ListRecord for ExamCenter {
    const TITLE: &'static str = "Exam centers";

    fn from_row(row: &RawRow<'_>) -> Result<Self, AdmError> {
        Ok(Self {
            id: row.required("id")?,
            name: row.required("name")?,
            code: row.string("code"),
            address: row.string("address"),
            capacity: row.int("capacity")?,
            operator: row.string("operator"),
        })
    }

    fn columns() -> Result<Columns<Self>, ConfigError> {
        Columns::new(
            vec![
                ColumnSpec::new(ExamCenterField::Name, "Name"),
                ColumnSpec::new(ExamCenterField::Code, "Code"),
                ColumnSpec::new(ExamCenterField::Address, "Address"),
                ColumnSpec::new(ExamCenterField::Capacity, "Capacity"),
                ColumnSpec::new(ExamCenterField::Operator, "Operator"),
            ],
            ExamCenterField::Name,
        )
    }
}

// -------------------------------------------------------------- mark columns

#[derive(Debug, Clone, PartialEq)]
pub struct MarkColumn {
    pub id: String,
    pub title: String,
    pub position: i64,
    pub max_marks: i64,
    pub weight: Option<f64>,
}

record_fields!(MarkColumnField {
    Id => "id",
    Title => "title",
    Position => "position",
    MaxMarks => "maxMarks",
    Weight => "weight",
});

impl Record for MarkColumn {
    type Field = MarkColumnField;

    fn value(&self, field: MarkColumnField) -> Value {
        match field {
            MarkColumnField::Id => Value::from(&self.id),
            MarkColumnField::Title => Value::from(&self.title),
            MarkColumnField::Position => Value::Int(self.position),
            MarkColumnField::MaxMarks => Value::Int(self.max_marks),
            MarkColumnField::Weight => Value::from(self.weight),
        }
    }
}

impl ListRecord for MarkColumn {
    const TITLE: &'static str = "Mark columns";

    fn from_row(row: &RawRow<'_>) -> Result<Self, AdmError> {
        Ok(Self {
            id: row.required("id")?,
            title: row.required("title")?,
            position: row.int("position")?.unwrap_or(row.row() as i64),
            max_marks: row
                .int("maxMarks")?
                .ok_or_else(|| row.invalid("missing value for `maxMarks`"))?,
            weight: row.float("weight")?,
        })
    }

    fn columns() -> Result<Columns<Self>, ConfigError> {
        Columns::new(
            vec![
                ColumnSpec::new(MarkColumnField::Position, "#").without_filter(),
                ColumnSpec::new(MarkColumnField::Title, "Title"),
                ColumnSpec::new(MarkColumnField::MaxMarks, "Max marks"),
                ColumnSpec::new(MarkColumnField::Weight, "Weight"),
            ],
            MarkColumnField::Position,
        )
    }
}

// --------------------------------------------------------------- credentials

#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub id: String,
    pub username: String,
    pub role: String,
    pub exam_center: Option<String>,
    pub active: bool,
}

record_fields!(CredentialField {
    Id => "id",
    Username => "username",
    Role => "role",
    ExamCenter => "examCenter",
    Active => "active",
});

impl Record for Credential {
    type Field = CredentialField;

    fn value(&self, field: CredentialField) -> Value {
        match field {
            CredentialField::Id => Value::from(&self.id),
            CredentialField::Username => Value::from(&self.username),
            CredentialField::Role => Value::from(&self.role),
            CredentialField::ExamCenter => Value::from(self.exam_center.as_ref()),
            CredentialField::Active => Value::Bool(self.active),
        }
    }
}

impl ListRecord for Credential {
    const TITLE: &'static str = "Credentials";

    fn from_row(row: &RawRow<'_>) -> Result<Self, AdmError> {
        Ok(Self {
            id: row.required("id")?,
            username: row.required("username")?,
            role: row.required("role")?,
            exam_center: row.string("examCenter"),
            active: row.flag("active")?.unwrap_or(true),
        })
    }

    fn columns() -> Result<Columns<Self>, ConfigError> {
        Columns::new(
            vec![
                ColumnSpec::new(CredentialField::Username, "Username"),
                ColumnSpec::new(CredentialField::Role, "Role"),
                ColumnSpec::new(CredentialField::ExamCenter, "Exam center"),
                ColumnSpec::new(CredentialField::Active, "Active").without_filter(),
            ],
            CredentialField::Username,
        )
    }
}
