//! Fixed user directory.
//!
//! Three pre-seeded users, read-only for the lifetime of the process. Issues
//! reference these entries by borrow; nothing ever copies or mutates them, so
//! the table needs no lock.

use serde::Serialize;

/// A directory entry an issue can be assigned to.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: u64,
    pub name: &'static str,
}

static USERS: &[User] = &[
    User {
        id: 1,
        name: "김개발",
    },
    User {
        id: 2,
        name: "이디자인",
    },
    User {
        id: 3,
        name: "박기획",
    },
];

/// Look up a user by id.
pub fn lookup(id: u64) -> Option<&'static User> {
    USERS.iter().find(|user| user.id == id)
}
