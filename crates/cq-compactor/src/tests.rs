use crate::*;
use crate::decoder::is_symbol_shaped;
use crate::layer2_identifiers;
use crate::layer3_repetition::{self, macro_symbol, RepetitionCompressor};
use crate::legend::{self, LegendEntry, MacroDef};
use crate::lexer::{self, TokenKind, TokenStream};
use cq_core::{CodecError, IdentifierKind, PatternKind, SirclConfig};

const WIDE_FIXTURE: &str = "int x_y_z_u_vw = 0; void step(void) { x_y_z_u_vw++; x_y_z_u_vw += 2; } \
                            int peek(void) { return x_y_z_u_vw * x_y_z_u_vw; }";

const ADD_FIXTURE: &str = "int add(int a, int b) { return a + b; } int add(int a, int b) { return a + b; }";

const TWO_SHAPES_FIXTURE: &str = "int add(int a,int b){return a+b;}int add(int a,int b){return a+b;}\
                                  void run(void){report_status(alpha,beta);report_status(alpha,beta);}";

const RING_BUFFER: &str = r#"
#include <stdio.h>
#include <stdlib.h>

/* Fixed-capacity ring buffer. */
typedef struct {
    int *slots;
    int capacity;
    int head_index;
    int tail_index;
} RingBuffer;

static int ring_capacity_limit = 64;

void ring_reset(RingBuffer *ring) {
    ring->head_index = 0;
    ring->tail_index = 0;
}

int ring_push(RingBuffer *ring, int value) {
    if (ring->tail_index - ring->head_index >= ring_capacity_limit) {
        return -1; // full
    }
    ring->slots[ring->tail_index % ring_capacity_limit] = value;
    ring->tail_index += 1;
    return 0;
}

int ring_pop(RingBuffer *ring) {
    int value = ring->slots[ring->head_index % ring_capacity_limit];
    ring->head_index += 1;
    return value;
}

int main(void) {
    RingBuffer ring;
    ring.slots = malloc(sizeof(int) * ring_capacity_limit);
    ring_reset(&ring);
    ring_push(&ring, 7);
    ring_push(&ring, 7);
    printf("%d\n", ring_pop(&ring));
    free(ring.slots);
    return 0;
}
"#;

fn config_with(f: impl FnOnce(&mut SirclConfig)) -> SirclConfig {
    let mut config = SirclConfig::default();
    f(&mut config);
    config
}

fn token_index(stream: &TokenStream<'_>, text: &str) -> usize {
    (0..stream.len()).find(|&i| stream.text(i) == text).unwrap()
}

// ========== Layer 1: Minify ==========

#[test]
fn test_l1_drops_line_comment_and_spaces() {
    assert_eq!(minify("int  x = 1; // c\n"), "int x=1;");
}

#[test]
fn test_l1_block_comment_is_a_gap() {
    assert_eq!(minify("int/*c*/x;"), "int x;");
}

#[test]
fn test_l1_string_literal_verbatim() {
    assert_eq!(minify(r#"char *s = "a  // b";"#), r#"char*s="a  // b";"#);
}

#[test]
fn test_l1_escaped_quote_in_string() {
    assert_eq!(minify(r#"s = "say \"hi\" /* no */";"#), r#"s="say \"hi\" /* no */";"#);
}

#[test]
fn test_l1_char_literal_verbatim() {
    assert_eq!(minify("c = '\\'' ;"), "c='\\'';");
}

#[test]
fn test_l1_preprocessor_line_kept() {
    let src = "#include <stdio.h>\nint main() {\n  return 0;\n}\n";
    assert_eq!(minify(src), "#include <stdio.h>\nint main(){return 0;}");
}

#[test]
fn test_l1_preprocessor_continuation() {
    let src = "#define MAX(a, b) \\\n  ((a) > (b))\nint x;";
    assert_eq!(minify(src), "#define MAX(a, b) \\\n  ((a) > (b))\nint x;");
}

#[test]
fn test_l1_operators_not_fused() {
    assert_eq!(minify("a - -b;"), "a- -b;");
    assert_eq!(minify("y = x / *p;"), "y=x/ *p;");
    assert_eq!(minify("i + ++j;"), "i+ ++j;");
}

#[test]
fn test_l1_empty() {
    assert_eq!(minify(""), "");
    assert_eq!(minify("   \n\t "), "");
}

#[test]
fn test_l1_idempotent() {
    for src in [RING_BUFFER, ADD_FIXTURE, WIDE_FIXTURE, "a - -b; y = x / *p;", "int/*c*/x;#define Y 1\nint z;"] {
        let once = minify(src);
        assert_eq!(minify(&once), once);
    }
}

// ========== Estimator ==========

#[test]
fn test_estimate_empty_is_zero() {
    assert_eq!(estimate_tokens(""), 0);
}

#[test]
fn test_estimate_minimum_one() {
    assert_eq!(estimate_tokens(" "), 1);
    assert_eq!(estimate_tokens("a"), 1);
}

#[test]
fn test_estimate_segment_lengths() {
    assert_eq!(estimate_tokens("abc"), 1);
    assert_eq!(estimate_tokens("abcd"), 1);
    assert_eq!(estimate_tokens("abcde"), 2);
    assert_eq!(estimate_tokens("x_y_z_u_vw"), 5);
}

#[test]
fn test_estimate_camel_discount() {
    // 15 chars, two lower→upper transitions: ceil(14 / 3.5)
    assert_eq!(estimate_tokens("bufferSizeLimit"), 4);
}

#[test]
fn test_estimate_specials_grouped() {
    assert_eq!(estimate_tokens(";;;"), 1);
    assert_eq!(estimate_tokens(";;;;"), 2);
}

#[test]
fn test_estimate_mixes_segments_and_specials() {
    // two one-char segments plus one group of specials
    assert_eq!(estimate_tokens("a+b"), 3);
    assert_eq!(estimate_tokens("x=1;"), 3);
    assert_eq!(estimate_tokens("a + b"), estimate_tokens("a+b"));
}

#[test]
fn test_estimate_symbols_cost_one() {
    assert_eq!(estimate_tokens("甲"), 1);
    assert_eq!(estimate_tokens("μA"), 1);
    assert_eq!(estimate_tokens("v12"), 1);
}

// ========== Lexer ==========

#[test]
fn test_lexer_token_kinds() {
    let stream = TokenStream::lex(r#"x=foo("s",'c',1.5e+3);"#);
    let kinds: Vec<TokenKind> = (0..stream.len()).map(|i| stream.kind(i)).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Ident,
            TokenKind::Punct,
            TokenKind::Ident,
            TokenKind::Punct,
            TokenKind::Str,
            TokenKind::Punct,
            TokenKind::Char,
            TokenKind::Punct,
            TokenKind::Number,
            TokenKind::Punct,
            TokenKind::Punct,
        ]
    );
}

#[test]
fn test_lexer_identifier_kinds() {
    let stream = TokenStream::lex("int foo(int bar){return bar;}");
    let occurrences = lexer::extract_identifiers(&stream);
    let names: Vec<&str> = occurrences.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["foo", "bar", "return", "bar"]);
    assert_eq!(occurrences[0].kind, IdentifierKind::Function);
    assert_eq!(occurrences[1].kind, IdentifierKind::Variable);
    assert_eq!(occurrences[2].kind, IdentifierKind::Variable);
    assert_eq!(lexer::frequency_table(&occurrences)["bar"], 2);
}

#[test]
fn test_lexer_declared_type_names() {
    let stream = TokenStream::lex("typedef struct Tag{int v;}Alias;struct Point{int x;};enum Mode;Point p;");
    assert!(stream.is_declared_type_name(token_index(&stream, "Tag")));
    assert!(stream.is_declared_type_name(token_index(&stream, "Alias")));
    assert!(stream.is_declared_type_name(token_index(&stream, "Point")));
    assert!(stream.is_declared_type_name(token_index(&stream, "Mode")));
    assert!(!stream.is_declared_type_name(token_index(&stream, "v")));
}

#[test]
fn test_lexer_struct_variable_is_not_declared_type() {
    let stream = TokenStream::lex("struct{int v;}value;");
    assert!(!stream.is_declared_type_name(token_index(&stream, "value")));
}

#[test]
fn test_lexer_words_include_literals() {
    let words = lexer::words("x=\"v0 inside\";#define T1 2\n");
    assert!(words.contains("v0"));
    assert!(words.contains("T1"));
}

// ========== Layer 2: Identifiers ==========

#[test]
fn test_l2_preservation_rules() {
    let config = SirclConfig::default();
    assert!(layer2_identifiers::is_preserved("idx", &config));
    assert!(layer2_identifiers::is_preserved("sizeof", &config));
    assert!(layer2_identifiers::is_preserved("return", &config));
    assert!(layer2_identifiers::is_preserved("malloc", &config));
    assert!(layer2_identifiers::is_preserved("Printf", &config));
    assert!(!layer2_identifiers::is_preserved("ring_capacity_limit", &config));

    let relaxed = config_with(|c| {
        c.preserve_control_flow = false;
        c.preserve_verbs = false;
    });
    assert!(!layer2_identifiers::is_preserved("return", &relaxed));
    assert!(!layer2_identifiers::is_preserved("malloc", &relaxed));
    assert!(layer2_identifiers::is_preserved("sizeof", &relaxed));
}

#[test]
fn test_l2_semantic_hint() {
    assert_eq!(layer2_identifiers::semantic_hint("buffer_size").as_deref(), Some("size"));
    assert_eq!(layer2_identifiers::semantic_hint("max_len_t").as_deref(), Some("len"));
    assert_eq!(layer2_identifiers::semantic_hint("counter"), None);
    assert_eq!(layer2_identifiers::semantic_hint("get_ptr"), None);
}

#[test]
fn test_l2_wide_symbol_with_hint() {
    let config = SirclConfig::default();
    let mut ctx = SymbolContext::new();
    let encoding = layer2_identifiers::encode(&minify(WIDE_FIXTURE), &config, &mut ctx);

    assert_eq!(encoding.entries.len(), 1);
    let entry = &encoding.entries[0];
    assert_eq!(entry.original, "x_y_z_u_vw");
    assert_eq!(entry.symbol, "甲");
    assert!(entry.wide);
    assert_eq!(entry.frequency, 5);
    assert_eq!(entry.net_savings, 12);
    assert_eq!(entry.legend_hint(), Some("vw"));
    assert_eq!(entry.kind, IdentifierKind::Variable);
    assert_eq!(
        encoding.text,
        "int 甲=0;void step(void){甲++;甲+=2;}int peek(void){return 甲*甲;}"
    );
    assert_eq!(ctx.original_of("甲"), Some("x_y_z_u_vw"));
}

#[test]
fn test_l2_ascii_when_hybrid_disabled() {
    let config = config_with(|c| c.hybrid_encoding = false);
    let mut ctx = SymbolContext::new();
    let encoding = layer2_identifiers::encode(&minify(WIDE_FIXTURE), &config, &mut ctx);
    assert_eq!(encoding.entries.len(), 1);
    let entry = &encoding.entries[0];
    assert_eq!(entry.symbol, "v0");
    assert!(!entry.wide);
    assert_eq!(entry.legend_hint(), None);
    assert_eq!(entry.net_savings, 13);
}

#[test]
fn test_l2_threshold_enforced() {
    let config = config_with(|c| c.min_net_savings = 1000);
    let mut ctx = SymbolContext::new();
    let text = minify(RING_BUFFER);
    let encoding = layer2_identifiers::encode(&text, &config, &mut ctx);
    assert!(encoding.entries.is_empty());
    assert_eq!(encoding.text, text);
    assert!(ctx.is_empty());
}

#[test]
fn test_l2_entries_meet_threshold_and_are_ordered() {
    let config = config_with(|c| c.min_net_savings = 2);
    let mut ctx = SymbolContext::new();
    let encoding = layer2_identifiers::encode(&minify(RING_BUFFER), &config, &mut ctx);
    assert!(!encoding.entries.is_empty());
    assert!(encoding.entries.iter().all(|e| e.net_savings >= 2));
    assert!(encoding.entries.windows(2).all(|w| w[0].net_savings >= w[1].net_savings));
}

#[test]
fn test_l2_mapping_injective() {
    let config = config_with(|c| c.min_net_savings = 0);
    let mut ctx = SymbolContext::new();
    let encoding = layer2_identifiers::encode(&minify(RING_BUFFER), &config, &mut ctx);

    let symbols: std::collections::HashSet<&str> =
        encoding.entries.iter().map(|e| e.symbol.as_str()).collect();
    let originals: std::collections::HashSet<&str> =
        encoding.entries.iter().map(|e| e.original.as_str()).collect();
    assert_eq!(symbols.len(), encoding.entries.len());
    assert_eq!(originals.len(), encoding.entries.len());
    for entry in &encoding.entries {
        assert_eq!(ctx.original_of(&entry.symbol), Some(entry.original.as_str()));
        assert_eq!(
            ctx.get(&entry.original).map(|a| a.symbol.as_str()),
            Some(entry.symbol.as_str())
        );
    }
}

#[test]
fn test_l2_declared_types_never_mapped() {
    let src = "typedef struct { int level; } WidgetState;\n\
               struct GadgetInfo { int level; };\n\
               typedef struct { int x; } Foo;\n\
               struct Bar { };\n\
               enum Baz;\n\
               WidgetState make_state(struct GadgetInfo *info) { WidgetState s; s.level = info->level; return s; }\n\
               WidgetState copy_state(WidgetState other) { WidgetState out = other; return out; }\n\
               struct GadgetInfo *pick(struct GadgetInfo *a, struct GadgetInfo *b) { return a; }\n";
    let config = config_with(|c| c.min_net_savings = 0);
    let mut ctx = SymbolContext::new();
    let encoding = layer2_identifiers::encode(&minify(src), &config, &mut ctx);
    for name in ["Foo", "Bar", "Baz", "WidgetState", "GadgetInfo"] {
        assert!(encoding.entries.iter().all(|e| e.original != name), "{name} was mapped");
        assert!(ctx.get(name).is_none());
    }
    assert!(encoding.text.contains("}WidgetState;"));
    assert!(encoding.text.contains("struct GadgetInfo{"));
}

#[test]
fn test_l2_native_words_never_allocated() {
    // `甲` already appears in the file, so the next glyph is used.
    let src = format!("{WIDE_FIXTURE} const char *label = \"甲\";");
    let mut ctx = SymbolContext::new();
    let encoding = layer2_identifiers::encode(&minify(&src), &SirclConfig::default(), &mut ctx);
    let entry = encoding.entries.iter().find(|e| e.original == "x_y_z_u_vw").unwrap();
    assert_eq!(entry.symbol, "乙");
}

#[test]
fn test_l2_cross_file_stable_and_reset() {
    let pipeline = CompactorPipeline::default();
    let mut ctx = SymbolContext::new();
    let other = "void bump(void) { x_y_z_u_vw++; x_y_z_u_vw--; x_y_z_u_vw += 3; x_y_z_u_vw -= 1; x_y_z_u_vw *= 2; }";
    let artifacts = pipeline.encode_batch([WIDE_FIXTURE, other], &mut ctx);

    assert_eq!(artifacts[0].identifier_mapping[0].symbol, "甲");
    assert_eq!(artifacts[1].identifier_mapping[0].symbol, "甲");
    assert_eq!(artifacts[1].identifier_mapping[0].legend_hint(), Some("vw"));
    assert_eq!(ctx.len(), 1);

    ctx.reset();
    assert!(ctx.is_empty());
    assert_eq!(ctx.wide_remaining(), symbols::WIDE_SYMBOLS.len());
}

#[test]
fn test_l2_scratch_context_when_not_stable() {
    let pipeline = CompactorPipeline::new(config_with(|c| c.cross_file_stable = false)).unwrap();
    let mut ctx = SymbolContext::new();
    let artifact = pipeline.encode(WIDE_FIXTURE, &mut ctx);
    assert_eq!(artifact.identifier_mapping.len(), 1);
    assert!(ctx.is_empty());
}

#[test]
fn test_l2_symbol_context_never_reuses_symbols() {
    let mut ctx = SymbolContext::new();
    let taken = std::collections::HashSet::new();
    let first = ctx.propose(IdentifierKind::Variable, true, &taken);
    ctx.commit("alpha_value", IdentifierKind::Variable, first, None);
    let second = ctx.propose(IdentifierKind::Variable, true, &taken);
    assert_eq!(second.symbol, "乙");
    let ascii = ctx.propose(IdentifierKind::Function, false, &taken);
    assert_eq!(ascii.symbol, "f0");
}

#[test]
fn test_l2_wide_pool_exhaustion_falls_back_to_ascii() {
    let mut ctx = SymbolContext::new();
    let taken = std::collections::HashSet::new();
    for n in 0..symbols::WIDE_SYMBOLS.len() {
        let p = ctx.propose(IdentifierKind::Variable, true, &taken);
        assert!(p.wide);
        ctx.commit(&format!("name_{n}"), IdentifierKind::Variable, p, None);
    }
    assert_eq!(ctx.wide_remaining(), 0);
    let p = ctx.propose(IdentifierKind::Type, true, &taken);
    assert!(!p.wide);
    assert_eq!(p.symbol, "T0");
}

// ========== Layer 3: Repetition ==========

#[test]
fn test_l3_macro_symbols() {
    assert_eq!(macro_symbol(0), "μA");
    assert_eq!(macro_symbol(25), "μZ");
    assert_eq!(macro_symbol(26), "μAA");
    assert_eq!(macro_symbol(27), "μAB");
}

#[test]
fn test_l3_normalize() {
    let stream = TokenStream::lex("foo(bar,1,\"s\",'c');");
    let last = stream.len() - 1;
    assert_eq!(
        layer3_repetition::normalize(&stream, 0, last),
        "VAR ( VAR , NUM , STR , CHAR ) ;"
    );
}

#[test]
fn test_l3_detect_calls_and_assignments() {
    let compressor = RepetitionCompressor::new(&SirclConfig::default());

    let calls = compressor.detect("log_value(a,1);log_value(b,2);");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, PatternKind::FunctionCall);
    assert_eq!(calls[0].template, "log_value(a,1);");
    assert_eq!(calls[0].occurrences, vec![0, 15]);

    let assigns = compressor.detect("total_count+=delta;total_count+=delta;");
    assert_eq!(assigns.len(), 1);
    assert_eq!(assigns[0].kind, PatternKind::Assignment);
}

#[test]
fn test_l3_short_templates_ignored() {
    let compressor = RepetitionCompressor::new(&SirclConfig::default());
    assert!(compressor.detect("f(a);f(a);f(a);").is_empty());
}

#[test]
fn test_l3_duplicate_body_becomes_one_macro() {
    let mut compressor = RepetitionCompressor::new(&SirclConfig::default());
    let encoding = compressor.compress(&minify(ADD_FIXTURE));
    assert_eq!(encoding.macros.len(), 1);
    let m = &encoding.macros[0];
    assert_eq!(m.symbol, "μA");
    assert_eq!(m.template, "{return a+b;}");
    assert_eq!(m.kind, PatternKind::StructInit);
    assert_eq!(m.occurrences, 2);
    assert_eq!(m.net_savings, 2);
    assert_eq!(encoding.text, "int add(int a,int b)μA int add(int a,int b)μA");
    assert_eq!(compressor.templates()["μA"], "{return a+b;}");
}

#[test]
fn test_l3_differing_literals_not_compressed() {
    let mut compressor = RepetitionCompressor::new(&SirclConfig::default());
    let text = "log_value(a,1);log_value(b,2);";
    let encoding = compressor.compress(text);
    assert!(encoding.macros.is_empty());
    assert_eq!(encoding.text, text);
}

#[test]
fn test_l3_max_macros_respected() {
    let mut compressor = RepetitionCompressor::new(&config_with(|c| c.max_macros = 0));
    let text = minify(ADD_FIXTURE);
    let encoding = compressor.compress(&text);
    assert!(encoding.macros.is_empty());
    assert_eq!(encoding.text, text);
}

#[test]
fn test_l3_max_macros_caps_profitable_patterns() {
    let text = minify(TWO_SHAPES_FIXTURE);

    let encoding = RepetitionCompressor::new(&SirclConfig::default()).compress(&text);
    assert_eq!(encoding.macros.len(), 2);
    assert_eq!(encoding.macros[0].kind, PatternKind::FunctionCall);
    assert_eq!(encoding.macros[0].template, "report_status(alpha,beta);");
    assert_eq!(encoding.macros[0].net_savings, 5);
    assert_eq!(encoding.macros[1].symbol, "μB");
    assert_eq!(encoding.macros[1].template, "{return a+b;}");

    let mut capped = RepetitionCompressor::new(&config_with(|c| c.max_macros = 1));
    let encoding = capped.compress(&text);
    assert_eq!(encoding.macros.len(), 1);
    assert_eq!(encoding.macros[0].symbol, "μA");
    assert_eq!(encoding.macros[0].template, "report_status(alpha,beta);");
    assert_eq!(encoding.text.matches("{return a+b;}").count(), 2);
    assert_eq!(capped.templates().len(), 1);
}

#[test]
fn test_l3_literals_and_directives_untouched() {
    let text = "#define BODY {return a+b;}\nchar*s=\"{return a+b;}\";int f(int a,int b){return a+b;}int g(int a,int b){return a+b;}";
    let occurrences = layer3_repetition::find_occurrences(text, "{return a+b;}");
    assert_eq!(occurrences.len(), 2);
    assert!(occurrences.iter().all(|&pos| pos > text.find("int f").unwrap()));
}

// ========== Legend ==========

fn sample_legend() -> Legend {
    Legend {
        identifiers: vec![
            LegendEntry {
                symbol: "甲".into(),
                original: "buffer_size".into(),
                hint: Some("size".into()),
            },
            LegendEntry { symbol: "v0".into(), original: "counter".into(), hint: None },
        ],
        macros: vec![MacroDef { symbol: "μA".into(), template: "{return a+b;}".into() }],
    }
}

#[test]
fn test_legend_render() {
    assert_eq!(
        sample_legend().render(),
        "// IDENTIFIERS: 甲=buffer_size (size), v0=counter\n// MACROS:\n// μA = {return a+b;}"
    );
}

#[test]
fn test_legend_assemble_and_parse() {
    let legend = sample_legend();
    let artifact = legend.assemble("int x;");
    assert!(artifact.ends_with("\n\nint x;"));
    let (parsed, payload) = Legend::parse(&artifact).unwrap();
    assert_eq!(parsed, legend);
    assert_eq!(payload, "int x;");
}

#[test]
fn test_legend_empty_means_payload_only() {
    assert_eq!(Legend::default().assemble("int x;"), "int x;");
    let (parsed, payload) = Legend::parse("int x;").unwrap();
    assert!(parsed.is_empty());
    assert_eq!(payload, "int x;");
}

#[test]
fn test_legend_malformed_entry() {
    let err = Legend::parse("// IDENTIFIERS: 甲buffer\n\nint x;").unwrap_err();
    assert!(matches!(err, CodecError::LegendParse { line: 1, .. }));
}

#[test]
fn test_legend_not_injective() {
    let err = Legend::parse("// IDENTIFIERS: v0=alpha_one, v0=beta_two\n\nx;").unwrap_err();
    assert!(matches!(err, CodecError::LegendParse { .. }));
}

#[test]
fn test_legend_template_display() {
    let long = "a".repeat(70);
    let shown = legend::display_template(&long);
    assert_eq!(shown.chars().count(), 63);
    assert!(legend::looks_truncated(&shown));
    assert!(!legend::is_verbatim(&long));
    assert!(legend::is_verbatim("{return a+b;}"));
    assert_eq!(legend::display_template("{a;\nb;}"), "{a; b;}");
}

#[test]
fn test_legend_strip() {
    assert_eq!(Legend::strip("// MACROS:\n// μA = x\n\npayload"), "payload");
    assert_eq!(Legend::strip("payload"), "payload");
}

// ========== Decoder ==========

#[test]
fn test_decode_legend_free_text_unchanged() {
    let text = "int 甲=0;v0++;";
    let result = decode(text, &DecodeOptions::default()).unwrap();
    assert_eq!(result.code, text);
    assert!(result.decoded);
    assert!(result.unknown_symbols.is_empty());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_decode_restores_identifiers() {
    let artifact = "// IDENTIFIERS: 甲=x_y_z_u_vw (vw)\n\nint 甲=0;int peek(void){return 甲*甲;}";
    let result = decode(artifact, &DecodeOptions::default()).unwrap();
    assert_eq!(result.code, "int x_y_z_u_vw=0;int peek(void){return x_y_z_u_vw*x_y_z_u_vw;}");
    assert!(result.decoded);
}

#[test]
fn test_decode_macros_before_identifiers() {
    let artifact = "// IDENTIFIERS: v0=running_total\n// MACROS:\n// μA = v0+=step_size;\n\nμA μA";
    let result = decode(artifact, &DecodeOptions::default()).unwrap();
    assert_eq!(result.code, "running_total+=step_size; running_total+=step_size;");
}

#[test]
fn test_decode_unknown_glyph_non_strict() {
    let artifact = "// IDENTIFIERS: 甲=alpha_value\n\nint 甲=乙;";
    let result = decode(artifact, &DecodeOptions::default()).unwrap();
    assert!(result.decoded);
    assert_eq!(result.code, "int alpha_value=乙;");
    assert!(result.unknown_symbols.contains("乙"));
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_decode_unknown_glyph_strict() {
    let artifact = "// IDENTIFIERS: 甲=alpha_value\n\nint 甲=乙;";
    let options = DecodeOptions {
        strict: true,
        fallback_to_original: false,
        ..DecodeOptions::default()
    };
    let err = decode(artifact, &options).unwrap_err();
    match err {
        CodecError::UnknownSymbols(symbols) => assert_eq!(symbols, vec!["乙".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_strict_with_fallback() {
    let artifact = "// IDENTIFIERS: 甲=alpha_value\n\nint 甲=乙;";
    let options = DecodeOptions { strict: true, ..DecodeOptions::default() };
    let result = decode(artifact, &options).unwrap();
    assert!(!result.decoded);
    assert_eq!(result.code, "int 甲=乙;");
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_decode_tags_unmapped_symbols() {
    let artifact = "// IDENTIFIERS: 甲=alpha_value\n\nint 甲=乙;";
    let options = DecodeOptions { preserve_new_symbols: false, ..DecodeOptions::default() };
    let result = decode(artifact, &options).unwrap();
    assert_eq!(result.code, "int alpha_value=乙/*unmapped*/;");
}

#[test]
fn test_decode_malformed_legend() {
    let artifact = "// IDENTIFIERS: broken\n\nint v0;";
    let result = decode(artifact, &DecodeOptions::default()).unwrap();
    assert!(!result.decoded);
    assert_eq!(result.code, "int v0;");

    let options = DecodeOptions { fallback_to_original: false, ..DecodeOptions::default() };
    assert!(matches!(decode(artifact, &options), Err(CodecError::LegendParse { .. })));
}

#[test]
fn test_decode_warns_on_truncated_template() {
    let template = format!("{}...", "a".repeat(60));
    let artifact = format!("// MACROS:\n// μA = {template}\n\nμA");
    let result = decode(&artifact, &DecodeOptions::default()).unwrap();
    assert!(result.decoded);
    assert!(result.warnings.iter().any(|w| w.contains("truncated")));
}

#[test]
fn test_decode_symbol_shapes() {
    assert!(is_symbol_shaped("甲"));
    assert!(is_symbol_shaped("甲乙"));
    assert!(is_symbol_shaped("v12"));
    assert!(is_symbol_shaped("T0"));
    assert!(is_symbol_shaped("μAB"));
    assert!(!is_symbol_shaped("μ"));
    assert!(!is_symbol_shaped("value"));
    assert!(!is_symbol_shaped("x1"));
}

// ========== Pipeline ==========

#[test]
fn test_pipeline_rejects_invalid_config() {
    let err = CompactorPipeline::new(config_with(|c| c.min_frequency = 0)).unwrap_err();
    assert!(matches!(err, CodecError::InvalidConfig(_)));
}

#[test]
fn test_pipeline_keeps_validated_config() {
    let config = config_with(|c| c.cross_file_stable = false);
    let pipeline = CompactorPipeline::new(config.clone()).unwrap();
    assert_eq!(pipeline.config(), &config);
    assert_eq!(CompactorPipeline::default().config(), &SirclConfig::default());
}

#[test]
fn test_pipeline_minify_only() {
    let pipeline = CompactorPipeline::new(SirclConfig::minify_only()).unwrap();
    let artifact = pipeline.encode_file(RING_BUFFER);
    assert_eq!(artifact.code, minify(RING_BUFFER));
    assert_eq!(artifact.metadata.layers_applied, vec!["minify".to_string()]);
    assert!(artifact.identifier_mapping.is_empty());
    assert!(artifact.macro_legend.is_empty());
}

#[test]
fn test_pipeline_wide_scenario() {
    let artifact = CompactorPipeline::default().encode_file(WIDE_FIXTURE);
    assert!(artifact.code.starts_with("// IDENTIFIERS: 甲=x_y_z_u_vw (vw)\n\n"));
    assert_eq!(artifact.metadata.identifiers_encoded, 1);
    assert_eq!(artifact.metadata.wide_symbols_used, 1);
    assert_eq!(artifact.metadata.macros_created, 0);
}

#[test]
fn test_pipeline_duplicate_body_scenario() {
    let artifact = CompactorPipeline::default().encode_file(ADD_FIXTURE);
    assert_eq!(
        artifact.code,
        "// MACROS:\n// μA = {return a+b;}\n\nint add(int a,int b)μA int add(int a,int b)μA"
    );
    assert_eq!(artifact.metadata.macros_created, 1);
    assert_eq!(
        artifact.metadata.layers_applied,
        vec!["minify".to_string(), "repetition".to_string()]
    );
}

#[test]
fn test_pipeline_round_trip() {
    let pipeline = CompactorPipeline::new(config_with(|c| c.min_net_savings = 2)).unwrap();
    for src in [RING_BUFFER, ADD_FIXTURE, WIDE_FIXTURE] {
        let artifact = pipeline.encode_file(src);
        let decoded = pipeline.decode(&artifact.code, &DecodeOptions::default()).unwrap();
        assert!(decoded.decoded);
        assert!(decoded.unknown_symbols.is_empty());
        assert_eq!(minify(&decoded.code), minify(src));
    }
}

#[test]
fn test_pipeline_metadata_counts() {
    let artifact = CompactorPipeline::default().encode_file(RING_BUFFER);
    let meta = &artifact.metadata;
    assert!(meta.minified_tokens <= meta.original_tokens);
    assert_eq!(meta.encoded_tokens, estimate_tokens(&artifact.code));
    assert_eq!(meta.tokens_saved, meta.original_tokens as i64 - meta.encoded_tokens as i64);
}

#[test]
fn test_pipeline_artifact_serializes_camel_case() {
    let artifact = CompactorPipeline::default().encode_file(WIDE_FIXTURE);
    let value = serde_json::to_value(&artifact).unwrap();
    assert_eq!(value["metadata"]["identifiersEncoded"], 1);
    assert_eq!(value["identifierMapping"][0]["original"], "x_y_z_u_vw");
    assert!(value["macroLegend"].as_array().unwrap().is_empty());
}
