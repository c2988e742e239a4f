mod common;

use oggvorbis::*;

use common::*;

#[test]
fn parse_all_headers() {
    let headers = parse_headers(
        &ident_packet(2, 44100),
        &comment_packet("synthetic", &["TITLE=Test", "artist=Someone", "ARTIST=Else"]),
        &setup_packet(2),
        &Config::default()).unwrap();

    assert_eq!(headers.header().format(), Format { channels: 2, sample_rate: 44100 });
    assert_eq!(headers.header().frame_lens(), FrameLens::new(SHORT_LEN, LONG_LEN));
    assert_eq!(headers.header().bitrates().nom(), Some(96_000));

    let comments = headers.comments();
    assert_eq!(comments.vendor(), "synthetic");
    assert_eq!(comments.len(), 3);
    assert_eq!(comments.get("title").collect::<Vec<_>>(), vec!["Test"]);
    assert_eq!(comments.by_tag(CommentTag::Artist).collect::<Vec<_>>(), vec!["Someone", "Else"]);
}

#[test]
fn headerin_in_order() {
    let mut builder = Decoder::builder();
    assert_eq!(builder.headerin(&ident_packet(1, 8000)).unwrap(), PacketKind::Ident);
    assert_eq!(builder.header().map(|h| h.format()), Some(Format { channels: 1, sample_rate: 8000 }));
    assert_eq!(builder.next_header(), Some(PacketKind::Comment));

    assert_eq!(builder.headerin(&setup_packet(1)).unwrap_err(),
        Error::BadHeader("Header packet out of order"));
    assert_eq!(builder.headerin(&comment_packet("v", &[])).unwrap(), PacketKind::Comment);
    assert_eq!(builder.headerin(&setup_packet(1)).unwrap(), PacketKind::Setup);
    assert!(builder.is_complete());

    let decoder = builder.build().unwrap();
    assert_eq!(decoder.header().channel_count(), 1);
    assert_eq!(decoder.comments().vendor(), "v");
}

#[test]
fn not_vorbis() {
    let mut builder = Decoder::builder();
    assert_eq!(builder.headerin(b"\x01theora").unwrap_err(), Error::NotVorbis);
    assert_eq!(builder.headerin(&[0x01]).unwrap_err(), Error::NotVorbis);
    assert_eq!(builder.headerin(&silent_packet(false, 1)).unwrap_err(), Error::NotVorbis);
    assert_eq!(builder.next_header(), Some(PacketKind::Ident));
}

#[test]
fn kraft_violation_in_setup() {
    // Three codewords of length 2 leave part of the code space unused.
    let err = parse_headers(
        &ident_packet(1, 44100),
        &comment_packet("v", &[]),
        &setup_packet_with(1, &[2, 2, 2]),
        &Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadHeader);
    assert_eq!(err.severity(), Severity::Fatal);
    assert_eq!(err.code(), codes::OV_EBADHEADER);

    // Overspecified tree.
    let err = parse_headers(
        &ident_packet(1, 44100),
        &comment_packet("v", &[]),
        &setup_packet_with(1, &[1, 1, 1]),
        &Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadHeader);
}

#[test]
fn truncated_setup() {
    let setup = setup_packet(2);
    let err = parse_headers(
        &ident_packet(2, 44100),
        &comment_packet("v", &[]),
        &setup[..setup.len() / 2],
        &Config::default()).unwrap_err();
    assert_eq!(err, Error::BadHeader("Header packet is truncated"));
}

#[test]
fn configured_limits() {
    let config = Config {
        max_channels: 1,
        ..Config::default()
    };
    let mut builder = DecoderBuilder::with_config(config);
    assert_eq!(builder.headerin(&ident_packet(2, 44100)).unwrap_err().kind(), ErrorKind::BadHeader);
    assert!(builder.headerin(&ident_packet(1, 44100)).is_ok());
}

#[test]
fn strict_comments() {
    let comment = comment_packet("v", &["NOEQUALS"]);
    let lenient = parse_headers(&ident_packet(1, 44100), &comment, &setup_packet(1),
        &Config::default()).unwrap();
    assert_eq!(lenient.comments().raw(), &["NOEQUALS".to_string()]);

    let strict = Config {
        strict: true,
        ..Config::default()
    };
    assert_eq!(parse_headers(&ident_packet(1, 44100), &comment, &setup_packet(1), &strict)
        .unwrap_err().kind(), ErrorKind::BadHeader);
}
