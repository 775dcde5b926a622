//! Plain-text rendering of the listing state for the terminal.

use std::fmt::Write;

use crate::controller::ListingSnapshot;
use crate::models::Course;

const HEADERS: [&str; 5] = ["ID", "Name", "Credit", "Category", "Teacher"];

fn cells(course: &Course) -> [String; 5] {
    [
        course.id.to_string(),
        course.name.clone(),
        course.credit.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
        course.category.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()),
        course.teacher.clone().filter(|t| !t.is_empty()).unwrap_or_else(|| "-".to_string()),
    ]
}

pub fn course_table(courses: &[Course]) -> String {
    let rows: Vec<[String; 5]> = courses.iter().map(cells).collect();
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let line = |out: &mut String, values: &[String]| {
        let padded: Vec<String> = values
            .iter()
            .zip(widths)
            .map(|(v, w)| format!("{v}{}", " ".repeat(w - v.chars().count())))
            .collect();
        let _ = writeln!(out, "| {} |", padded.join(" | "));
    };

    line(&mut out, &HEADERS.map(str::to_string));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "|-{}-|", rule.join("-|-"));
    for row in &rows {
        line(&mut out, row);
    }
    out
}

/// Filters, table and pager in one block.
pub fn listing(snapshot: &ListingSnapshot) -> String {
    let mut out = String::new();
    let search = if snapshot.search.is_empty() { "-" } else { &snapshot.search };
    let teacher = if snapshot.teacher_filter.is_empty() {
        "all teachers"
    } else {
        &snapshot.teacher_filter
    };
    let status = if snapshot.loading {
        "Loading...".to_string()
    } else {
        format!("Total: {}", snapshot.total)
    };
    let _ = writeln!(out, "Search: {search}   Teacher: {teacher}   {status}");
    out.push_str(&course_table(&snapshot.courses));
    let _ = writeln!(out, "Page {}/{}", snapshot.page, snapshot.total_pages);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CourseId};

    #[test]
    fn missing_fields_render_as_dash() {
        let courses = vec![
            Course {
                id: CourseId::Number(1),
                name: "Algorithms".to_string(),
                credit: Some(3),
                category: Some(Category::Foundation),
                teacher: Some("Jane".to_string()),
            },
            Course {
                id: CourseId::Text("x9".to_string()),
                name: "Seminar".to_string(),
                credit: None,
                category: None,
                teacher: None,
            },
        ];
        let table = course_table(&courses);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Algorithms") && lines[2].contains("Cơ sở"));
        let dashes = lines[3].split('|').filter(|cell| cell.trim() == "-").count();
        assert_eq!(dashes, 3);
    }
}
