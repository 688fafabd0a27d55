mod table;

pub use table::Table;

use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const STUDENTS_FILE: &str = "alunos.csv";
pub const COURSES_FILE: &str = "cursos.csv";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("unable to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{file}: {source}")]
    Csv { file: String, source: csv::Error },
    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: &'static str },
    #[error("{file}: line {line}: invalid number '{value}' in column '{column}'")]
    InvalidNumber {
        file: String,
        line: usize,
        column: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub name: String,
    pub current_job: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub course_name: String,
    pub duration_weeks: Option<f64>,
    pub level: Option<String>,
}

/// Typed records plus the raw table they were read from. Columns that are not
/// part of the record types stay available through [`Dataset::table`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    table: Table,
    records: Vec<T>,
}

impl<T> Dataset<T> {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub students: Dataset<Student>,
    pub courses: Dataset<Course>,
}

impl Datasets {
    pub fn load(data_dir: &Path) -> Result<Self, DataError> {
        let students = read_table(&data_dir.join(STUDENTS_FILE))?;
        let courses = read_table(&data_dir.join(COURSES_FILE))?;
        Self::from_tables(students, courses)
    }

    pub fn from_tables(students: Table, courses: Table) -> Result<Self, DataError> {
        Ok(Self {
            students: parse_students(students)?,
            courses: parse_courses(courses)?,
        })
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn from_csv_strs(students: &str, courses: &str) -> Result<Self, DataError> {
        let students = Table::from_csv_reader(students.as_bytes()).map_err(|source| {
            DataError::Csv {
                file: STUDENTS_FILE.to_string(),
                source,
            }
        })?;
        let courses = Table::from_csv_reader(courses.as_bytes()).map_err(|source| {
            DataError::Csv {
                file: COURSES_FILE.to_string(),
                source,
            }
        })?;
        Self::from_tables(students, courses)
    }
}

fn read_table(path: &Path) -> Result<Table, DataError> {
    let file = File::open(path).map_err(|source| DataError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Table::from_csv_reader(file).map_err(|source| DataError::Csv {
        file: file_label(path),
        source,
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parse_students(table: Table) -> Result<Dataset<Student>, DataError> {
    let name = required_column(&table, STUDENTS_FILE, "name")?;
    let current_job = required_column(&table, STUDENTS_FILE, "current_job")?;
    let region = required_column(&table, STUDENTS_FILE, "region")?;

    let records = (0..table.len())
        .map(|row| Student {
            name: table.cell(row, name).unwrap_or_default().to_string(),
            current_job: table.cell(row, current_job).map(ToOwned::to_owned),
            region: table.cell(row, region).map(ToOwned::to_owned),
        })
        .collect();

    Ok(Dataset { table, records })
}

fn parse_courses(table: Table) -> Result<Dataset<Course>, DataError> {
    let course_name = required_column(&table, COURSES_FILE, "course_name")?;
    let duration_weeks = required_column(&table, COURSES_FILE, "duration_weeks")?;
    let level = required_column(&table, COURSES_FILE, "level")?;

    let mut records = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let duration = match table.cell(row, duration_weeks) {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|_| {
                DataError::InvalidNumber {
                    file: COURSES_FILE.to_string(),
                    // header is line 1
                    line: row + 2,
                    column: "duration_weeks",
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };

        records.push(Course {
            course_name: table.cell(row, course_name).unwrap_or_default().to_string(),
            duration_weeks: duration,
            level: table.cell(row, level).map(ToOwned::to_owned),
        });
    }

    Ok(Dataset { table, records })
}

fn required_column(table: &Table, file: &str, column: &'static str) -> Result<usize, DataError> {
    table
        .column_index(column)
        .ok_or_else(|| DataError::MissingColumn {
            file: file.to_string(),
            column,
        })
}
