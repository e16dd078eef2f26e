mod markdown;

pub(crate) use markdown::parse_markdown_note;
