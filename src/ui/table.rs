use tabled::{settings::Style, Table, Tabled};
use crate::record::StudentRecord;

/// One student as a terminal table row
#[derive(Tabled)]
pub struct StudentRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Email")]
    pub email: String,
    #[tabled(rename = "Phone")]
    pub phone: String,
    #[tabled(rename = "City")]
    pub city: String,
    #[tabled(rename = "State")]
    pub state: String,
    #[tabled(rename = "Updated")]
    pub updated: String,
}

impl From<&StudentRecord> for StudentRow {
    fn from(record: &StudentRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            city: record.city.clone(),
            state: record.state.clone(),
            updated: record.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Render students as a rounded table, or an empty string when there are none
pub fn student_table(students: &[StudentRecord]) -> String {
    if students.is_empty() {
        return String::new();
    }

    let rows: Vec<StudentRow> = students.iter().map(StudentRow::from).collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}
