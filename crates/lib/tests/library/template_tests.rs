use proptest::prelude::*;

use condstack_lib::reference::{DeferredRef, Segment, Template, parse, render};

fn segment() -> impl Strategy<Value = Segment> {
  prop_oneof![
    "[a-z${}]{0,6}".prop_map(Segment::Literal),
    "[a-z]{1,4}".prop_map(|name| Segment::Ref(DeferredRef::parameter(name))),
    ("[a-z][a-z-]{0,4}", "[a-z]{1,4}").prop_map(|(id, attr)| Segment::Ref(DeferredRef::resource(id, attr))),
  ]
}

/// Adjacent literals merged and empty ones dropped, as `parse` returns them.
fn canonical(segments: Vec<Segment>) -> Vec<Segment> {
  let mut out: Vec<Segment> = Vec::new();
  for segment in segments {
    if let Segment::Literal(s) = &segment {
      if s.is_empty() {
        continue;
      }
      if let Some(Segment::Literal(prev)) = out.last_mut() {
        prev.push_str(s);
        continue;
      }
    }
    out.push(segment);
  }
  out
}

proptest! {
  #[test]
  fn rendered_segments_parse_back(segments in prop::collection::vec(segment(), 0..8)) {
    let expected = canonical(segments.clone());
    prop_assert_eq!(parse(&render(&segments)).unwrap(), expected);
  }

  #[test]
  fn template_text_never_gains_references(text in "[a$${}]{0,12}") {
    let literal = vec![Segment::Literal(text.clone())];
    let json = serde_json::to_string(&Template::parse(&render(&literal)).unwrap()).unwrap();
    let back: Template = serde_json::from_str(&json).unwrap();
    prop_assert_eq!(back.references().count(), 0);
    let expected = canonical(literal);
    prop_assert_eq!(back.segments(), expected.as_slice());
  }
}
