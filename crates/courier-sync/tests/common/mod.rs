#![allow(dead_code)]

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use courier_types::{RemoteReply, RemoteSource, RemoteSubmission, SourceKey};
use uuid::Uuid;

pub fn source() -> RemoteSource {
    RemoteSource {
        uuid: Uuid::new_v4(),
        journalist_designation: "pericardial surfacing".into(),
        is_flagged: false,
        key: SourceKey {
            key_type: Some("PGP".into()),
            public: Some("-----BEGIN PGP PUBLIC KEY BLOCK-----".into()),
            fingerprint: Some("B2FF7FB28EED8CABEBC5FB6C6179D97BCFA52E5F".into()),
        },
        interaction_count: 3,
        is_starred: false,
        last_updated: "2018-09-11T11:42:31.366649Z".into(),
    }
}

pub fn submission(source: &RemoteSource, filename: &str) -> RemoteSubmission {
    RemoteSubmission {
        uuid: Uuid::new_v4(),
        filename: filename.into(),
        size: 1234,
        download_url: format!("/api/v1/sources/{}/submissions/x/download", source.uuid),
        is_read: false,
        source_uuid: source.uuid,
    }
}

pub fn reply(source: &RemoteSource, filename: &str, journalist: Uuid) -> RemoteReply {
    RemoteReply {
        uuid: Uuid::new_v4(),
        filename: filename.into(),
        size: 1234,
        source_uuid: source.uuid,
        journalist_uuid: journalist,
        journalist_username: "dellsberg".into(),
    }
}

pub fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"I am test content").unwrap();
}

/// Names currently in the data directory.
pub fn listing(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}
