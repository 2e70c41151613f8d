use crate::schema::users;

#[derive(Debug, Clone, PartialEq, Queryable)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// `sha256$<salt>$<digest>`, see `auth::hash_password`
    pub password: String,
}

#[derive(Debug, Clone, Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Fields to overwrite on an existing user, `None` keeps the stored value.
#[derive(Debug, Clone, Default, AsChangeset)]
#[table_name = "users"]
pub struct UserChanges {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(password) = self.password {
            user.password = password;
        }
    }
}
