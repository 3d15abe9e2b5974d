/// Parse `source` into a lossless syntax tree plus diagnostics.
///
/// ## Notes
/// - Never fails: malformed input yields `Error` nodes and diagnostics.
/// - `parse(src, f).tree().text(src) == src` holds for every input.
#[tracing::instrument(skip_all, fields(len = source.len(), features = features.bits()))]
pub fn parse(source: &[u8], features: ExperimentalFeatures) -> Parse {
    let lexed = lexer::lex(source);
    Parser::new(lexed, features).parse()
}
