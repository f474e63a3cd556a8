use crate::input::Text;

/// Free text attached to a node with `Has_comment`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    pub fn parse(text: &Text) -> Comment {
        Comment {
            text: text.to_string(),
        }
    }
}
