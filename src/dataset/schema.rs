use std::fmt;

/// Physical storage type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int64,
    Float64,
    Str,
}

/// The fields of a salary record, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    WorkYear,
    ExperienceLevel,
    EmploymentType,
    JobTitle,
    SalaryInUsd,
    RemoteRatio,
    CompanySize,
    EmployeeCountry,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::WorkYear,
        Field::ExperienceLevel,
        Field::EmploymentType,
        Field::JobTitle,
        Field::SalaryInUsd,
        Field::RemoteRatio,
        Field::CompanySize,
        Field::EmployeeCountry,
    ];

    /// Header name of the field in the CSV file.
    pub const fn column_name(self) -> &'static str {
        match self {
            Field::WorkYear => "work_year",
            Field::ExperienceLevel => "experience_level",
            Field::EmploymentType => "employment_type",
            Field::JobTitle => "job_title",
            Field::SalaryInUsd => "salary_in_usd",
            Field::RemoteRatio => "remote_ratio",
            Field::CompanySize => "company_size",
            Field::EmployeeCountry => "employee_country",
        }
    }

    pub const fn column_type(self) -> ColumnType {
        match self {
            Field::WorkYear => ColumnType::Int64,
            Field::SalaryInUsd => ColumnType::Float64,
            _ => ColumnType::Str,
        }
    }

    /// `employment_type` is never read by the engines, so files without it still load.
    pub const fn is_required(self) -> bool {
        !matches!(self, Field::EmploymentType)
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_column_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column_name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Where each known field sits in the header row of a particular file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Position of each [`Field`] in the header, indexed by [`Field::index`].
    positions: [Option<usize>; 8],
    /// Number of fields every data row must have.
    width: usize,
}

impl HeaderLayout {
    /// Maps header names to fields. Unknown columns are ignored; the first
    /// occurrence wins when a name repeats.
    pub fn resolve(headers: &[String]) -> Result<Self, Field> {
        let mut positions = [None; 8];
        for (pos, name) in headers.iter().enumerate() {
            if let Some(field) = Field::from_column_name(name.trim()) {
                positions[field.index()].get_or_insert(pos);
            }
        }

        if let Some(missing) = Field::ALL
            .into_iter()
            .find(|f| f.is_required() && positions[f.index()].is_none())
        {
            return Err(missing);
        }

        Ok(HeaderLayout {
            positions,
            width: headers.len(),
        })
    }

    pub fn position(&self, field: Field) -> Option<usize> {
        self.positions[field.index()]
    }

    pub fn width(&self) -> usize {
        self.width
    }
}
