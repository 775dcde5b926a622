use chrono::Utc;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::client::SortOrder;
use crate::models::{Course, CourseId, NewCourseRequest, User};

#[derive(Debug, FromRow)]
struct CourseRow {
    id: i64,
    name: String,
    credit: i64,
    category: String,
    teacher: Option<String>,
}

impl CourseRow {
    fn into_course(self) -> Course {
        Course {
            id: CourseId::Number(self.id),
            name: self.name,
            credit: u32::try_from(self.credit).ok(),
            category: self.category.parse().ok(),
            teacher: self.teacher,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
}

impl UserRow {
    fn into_user(self) -> (User, String) {
        (
            User {
                id: self.id,
                email: self.email,
                username: self.username,
            },
            self.password_hash,
        )
    }
}

/// Columns `_sort` may name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortColumn {
    #[default]
    Id,
    Name,
    Credit,
    Category,
    Teacher,
}

impl SortColumn {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "id" => Some(SortColumn::Id),
            "name" => Some(SortColumn::Name),
            "credit" => Some(SortColumn::Credit),
            "category" => Some(SortColumn::Category),
            "teacher" => Some(SortColumn::Teacher),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Name => "name",
            SortColumn::Credit => "credit",
            SortColumn::Category => "category",
            SortColumn::Teacher => "teacher",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    pub name_like: Option<String>,
    pub teacher: Option<String>,
    pub sort: SortColumn,
    pub order: SortOrder,
    /// `(page, limit)`; no paging when `None`.
    pub paging: Option<(u32, u32)>,
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a CourseFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(name) = &filter.name_like {
        builder
            .push(" AND name LIKE ")
            .push_bind(escape_like(name))
            .push(" ESCAPE '\\'");
    }
    if let Some(teacher) = &filter.teacher {
        builder.push(" AND teacher = ").push_bind(teacher.as_str());
    }
}

pub async fn count_courses(db: &SqlitePool, filter: &CourseFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM courses");
    push_filters(&mut builder, filter);
    builder.build_query_scalar::<i64>().fetch_one(db).await
}

pub async fn fetch_courses(db: &SqlitePool, filter: &CourseFilter) -> Result<Vec<Course>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT id, name, credit, category, teacher FROM courses");
    push_filters(&mut builder, filter);

    let direction = match filter.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    builder.push(format!(" ORDER BY {} {}, id ASC", filter.sort.column(), direction));

    if let Some((page, limit)) = filter.paging {
        let offset = i64::from(page.max(1) - 1) * i64::from(limit);
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(offset);
    }

    let rows = builder.build_query_as::<CourseRow>().fetch_all(db).await?;
    Ok(rows.into_iter().map(CourseRow::into_course).collect())
}

pub async fn fetch_course(db: &SqlitePool, id: i64) -> Result<Option<Course>, sqlx::Error> {
    let row = sqlx::query_as::<_, CourseRow>(
        "SELECT id, name, credit, category, teacher FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row.map(CourseRow::into_course))
}

pub async fn insert_course(db: &SqlitePool, req: NewCourseRequest) -> Result<Course, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO courses (name, credit, category, teacher)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&req.name)
    .bind(i64::from(req.credit))
    .bind(req.category.as_str())
    .bind(&req.teacher)
    .execute(db)
    .await?;

    Ok(req.into_course(CourseId::Number(result.last_insert_rowid())))
}

pub async fn update_course(
    db: &SqlitePool,
    id: i64,
    req: NewCourseRequest,
) -> Result<Option<Course>, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE courses
        SET name = ?1, credit = ?2, category = ?3, teacher = ?4
        WHERE id = ?5
        "#,
    )
    .bind(&req.name)
    .bind(i64::from(req.credit))
    .bind(req.category.as_str())
    .bind(&req.teacher)
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(req.into_course(CourseId::Number(id))))
}

pub async fn delete_course(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_user(
    db: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(db)
    .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        email: email.to_string(),
        username: username.to_string(),
    })
}

/// The user and their stored password hash.
pub async fn find_user_by_email(
    db: &SqlitePool,
    email: &str,
) -> Result<Option<(User, String)>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, password_hash FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(row.map(UserRow::into_user))
}

pub async fn insert_session(db: &SqlitePool, token: &str, user_id: i64) -> Result<(), sqlx::Error> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)")
        .bind(token)
        .bind(user_id)
        .bind(now)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn find_session_user(db: &SqlitePool, token: &str) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token = ?
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await?;
    Ok(row.map(|r| r.into_user().0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_patterns_escape_wildcards() {
        assert_eq!(escape_like("50%_off"), "%50\\%\\_off%");
        assert_eq!(escape_like("algo"), "%algo%");
    }

    #[test]
    fn sort_column_whitelist() {
        assert_eq!(SortColumn::parse("credit"), Some(SortColumn::Credit));
        assert_eq!(SortColumn::parse("id; DROP TABLE courses"), None);
    }
}
