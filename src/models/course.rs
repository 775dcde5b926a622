use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server-assigned course identifier. json-server style backends hand out
/// numbers, but string ids are accepted as well.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CourseId {
    Number(i64),
    Text(String),
}

impl CourseId {
    /// Numeric view of the id, also for numeric text such as `"12"`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CourseId::Number(n) => Some(*n as f64),
            CourseId::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseId::Number(n) => write!(f, "{n}"),
            CourseId::Text(s) => f.write_str(s),
        }
    }
}

impl FromStr for CourseId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(n) => CourseId::Number(n),
            Err(_) => CourseId::Text(s.to_string()),
        })
    }
}

impl From<i64> for CourseId {
    fn from(n: i64) -> Self {
        CourseId::Number(n)
    }
}

/// Numeric comparison when both ids are numeric, lexicographic otherwise.
pub fn compare_ids(a: &CourseId, b: &CourseId) -> Ordering {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

pub fn sort_by_id(courses: &mut [Course]) {
    courses.sort_by(|a, b| compare_ids(&a.id, &b.id));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "Chuyên ngành")]
    Major,
    #[serde(rename = "Cơ sở")]
    Foundation,
    #[serde(rename = "Đại cương")]
    General,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Major, Category::Foundation, Category::General];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Major => "Chuyên ngành",
            Category::Foundation => "Cơ sở",
            Category::General => "Đại cương",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub credit: Option<u32>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub teacher: Option<String>,
}

/// Body of `POST /courses` and `PUT /courses/:id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCourseRequest {
    pub name: String,
    pub credit: u32,
    pub category: Category,
    #[serde(default)]
    pub teacher: Option<String>,
}

impl NewCourseRequest {
    pub fn into_course(self, id: CourseId) -> Course {
        Course {
            id,
            name: self.name,
            credit: Some(self.credit),
            category: Some(self.category),
            teacher: self.teacher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: CourseId) -> Course {
        Course {
            id,
            name: "Course".to_string(),
            credit: Some(3),
            category: Some(Category::General),
            teacher: None,
        }
    }

    #[test]
    fn numeric_ids_sort_numerically() {
        let mut courses = vec![
            course(CourseId::Number(10)),
            course(CourseId::Text("2".to_string())),
            course(CourseId::Number(1)),
        ];
        sort_by_id(&mut courses);
        let ids: Vec<String> = courses.iter().map(|c| c.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn mixed_ids_fall_back_to_lexicographic() {
        assert_eq!(
            compare_ids(&CourseId::Text("b1".to_string()), &CourseId::Number(10)),
            Ordering::Greater
        );
        assert_eq!(
            compare_ids(&CourseId::Text("a".to_string()), &CourseId::Text("b".to_string())),
            Ordering::Less
        );
    }

    #[test]
    fn course_deserializes_string_and_number_ids() {
        let json = r#"[{"id": 7, "name": "Networks", "credit": 3, "category": "Cơ sở", "teacher": "Jane"},
                       {"id": "a1b2", "name": "Compilers"}]"#;
        let courses: Vec<Course> = serde_json::from_str(json).unwrap();
        assert_eq!(courses[0].id, CourseId::Number(7));
        assert_eq!(courses[0].category, Some(Category::Foundation));
        assert_eq!(courses[1].id, CourseId::Text("a1b2".to_string()));
        assert_eq!(courses[1].credit, None);
        assert_eq!(courses[1].teacher, None);
    }

    #[test]
    fn category_parses_display_names() {
        assert_eq!("Đại cương".parse::<Category>(), Ok(Category::General));
        assert!("Elective".parse::<Category>().is_err());
        assert_eq!(Category::default(), Category::Major);
    }
}
