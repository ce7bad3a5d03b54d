use crate::{
    model::{
        Id,
        user::{User, UserMarker},
    },
    validation::{FieldError, non_blank},
};
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub author: User,
    pub content: PostContent,
}

impl Post {
    /// Server-assigned creation time, taken from the post's id.
    #[must_use]
    pub fn time(&self) -> UtcDateTime {
        self.id.created_at()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreatePost {
    pub author: Id<UserMarker>,
    pub content: PostContent,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct PostContent(String);

impl PostContent {
    pub fn new(content: &str) -> Result<Self, FieldError> {
        Ok(Self(non_blank(content)?.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}
