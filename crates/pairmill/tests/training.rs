//! End-to-end training, encoding, and persistence checks.

use pairmill::{PairmillError, SplitRule, Tokenizer};

fn fit(
    rule: SplitRule,
    vocab_size: usize,
    corpus: &str,
) -> (Tokenizer<u32>, usize) {
    let mut tok = Tokenizer::new(rule);
    let effective = tok
        .fit_bytes(vocab_size, corpus.as_bytes(), Some(1))
        .unwrap();
    (tok, effective)
}

#[test]
fn classic_textbook_corpus() {
    let (tok, effective) = fit(SplitRule::split_bytes(""), 259, "aaabdaaabac");

    assert_eq!(effective, 259);
    assert_eq!(tok.merges(), &[(97, 97), (256, 97), (257, 98)]);

    let ids = tok.encode("aaabdaaabac").unwrap();
    assert_eq!(ids, vec![258, 100, 258, 97, 99]);
    assert_eq!(tok.decode_to_string(&ids).unwrap(), "aaabdaaabac");
}

#[test]
fn in_word_pairs_beat_space_crossings() {
    let (tok, effective) = fit(SplitRule::split_bytes(" "), 260, "hug pug pun bun hug");

    assert_eq!(effective, 260);
    // "ug" is the most frequent in-word pair; nothing ever merges into a
    // following space.
    assert_eq!(tok.merges()[0], (117, 103));
    assert!(tok.merges().iter().all(|&(_, b)| b != 32));

    let ids = tok.encode("hug pug pun bun hug").unwrap();
    assert_eq!(tok.decode_to_string(&ids).unwrap(), "hug pug pun bun hug");
}

#[test]
fn single_character_encode() {
    let (tok, _) = fit(SplitRule::split_bytes(""), 257, "ab");
    assert_eq!(tok.encode("A").unwrap(), vec![65]);
    assert_eq!(tok.decode_to_string(&[65]).unwrap(), "A");
}

#[test]
fn early_exit_on_tiny_corpus() {
    let (tok, effective) = fit(SplitRule::split_bytes(""), 1024, "ab");

    assert_eq!(effective, 257);
    assert_eq!(tok.vocab_size(), 257);
    assert_eq!(tok.merges(), &[(97, 98)]);
}

#[test]
fn boundary_sentinel_isolates_chunks() {
    let (tok, _) = fit(SplitRule::split_bytes(" "), 257, "ab ab");

    assert_eq!(tok.merges(), &[(97, 98)]);
    assert!(tok.merges().iter().all(|&(a, b)| a != 32 && b != 32));
}

#[test]
fn save_then_reload_encodes_identically() {
    let corpus = "low lower lowest newer newest wide wider widest";
    let (tok, _) = fit(SplitRule::split_bytes(" "), 290, corpus);

    let dir = tempdir::TempDir::new("pairmill_test").unwrap();
    let path = dir.path().join("tokenizer.bpe");

    tok.save(&path).unwrap();
    let loaded = Tokenizer::<u32>::load(&path).unwrap();

    assert_eq!(loaded.rule(), tok.rule());
    assert_eq!(loaded.merges(), tok.merges());
    assert_eq!(
        loaded.encode(corpus).unwrap(),
        tok.encode(corpus).unwrap(),
        "reloaded model must encode the training corpus byte-for-byte"
    );
}

#[test]
fn round_trip_over_mixed_samples() {
    let corpus = "the quick brown fox jumps over the lazy dog \
                  pack my box with five dozen liquor jugs \
                  how vexingly quick daft zebras jump";
    let (tok, _) = fit(SplitRule::split_bytes(" "), 320, corpus);

    for text in [
        "the quick brown fox",
        "jugs of liquor",
        "zebras jump over boxes",
        "unseen words still round trip",
        "caf\u{00e9} na\u{00ef}ve \u{4f60}\u{597d}",
        "punctuation!?;",
    ] {
        let ids = tok.encode(text).unwrap();
        assert_eq!(tok.decode_to_string(&ids).unwrap(), text, "{text:?}");
    }
}

#[test]
fn regex_rule_round_trip() {
    let rule = SplitRule::regex(r"\s+|\S+").unwrap();
    let corpus = "to be or not to be that is the question";
    let (tok, _) = fit(rule, 300, corpus);

    for text in [corpus, "to be continued", "or not"] {
        let ids = tok.encode(text).unwrap();
        assert_eq!(tok.decode_to_string(&ids).unwrap(), text, "{text:?}");
    }
}

#[test]
fn vocabulary_closure_holds() {
    let corpus = "low lower lowest newer newest wide wider widest";
    let (tok, _) = fit(SplitRule::split_bytes(" "), 300, corpus);

    for (k, &(a, b)) in tok.merges().iter().enumerate() {
        let id = 256 + k as u32;
        assert!(a < id && b < id, "merge {k} ({a}, {b}) breaks closure");
    }
}

#[test]
fn identical_runs_learn_identical_merges() {
    let corpus = "she sells sea shells by the sea shore";
    let (a, _) = fit(SplitRule::split_bytes(" "), 290, corpus);
    let (b, _) = fit(SplitRule::split_bytes(" "), 290, corpus);

    assert_eq!(a.merges(), b.merges());
}

#[test]
fn requesting_too_small_a_vocab_fails() {
    let mut tok: Tokenizer<u32> = Tokenizer::new(SplitRule::split_bytes(" "));
    assert!(matches!(
        tok.fit_bytes(100, b"abc", Some(1)),
        Err(PairmillError::VocabSizeTooSmall { size: 100 })
    ));
}
