use seedcast_core::{
    CandidateMatch, Category, DestinationId, DiscKind, ReleaseDescriptor, ReleaseType,
};
use seedcast_matcher::{DuplicateMatcher, PolicyTable};

fn id(s: &str) -> DestinationId {
    DestinationId::new(s).expect("valid destination id")
}

fn web_episode() -> ReleaseDescriptor {
    ReleaseDescriptor {
        category: Some(Category::Tv),
        release_type: Some(ReleaseType::WebDl),
        resolution: Some("1080p".to_string()),
        season: Some("S01".to_string()),
        episode: Some("E02".to_string()),
        ..ReleaseDescriptor::named("Show.S01E02.1080p.WEB-DL.DDP5.1.H.264")
    }
}

#[test]
fn test_season_pack_candidate_is_duplicate_of_episode() {
    let matcher = DuplicateMatcher::default();
    let candidate = CandidateMatch::named("Show.S01.1080p.WEB-DL.DDP5.1.H.264");

    let dupes = matcher.filter(std::slice::from_ref(&candidate), &web_episode(), &id("BLU"));

    assert_eq!(dupes, vec![candidate]);
}

#[test]
fn test_lower_resolution_candidate_is_excluded() {
    let matcher = DuplicateMatcher::default();
    let candidate = CandidateMatch::named("Show.S01E02.720p.WEB-DL.DDP5.1.H.264");

    assert!(matcher
        .filter(&[candidate], &web_episode(), &id("BLU"))
        .is_empty());
}

#[test]
fn test_1080p_hdr_release_not_duplicated_by_2160p() {
    let matcher = DuplicateMatcher::default();
    let release = ReleaseDescriptor {
        resolution: Some("1080p".to_string()),
        hdr: Some("HDR10".to_string()),
        release_type: Some(ReleaseType::Encode),
        category: Some(Category::Movie),
        ..ReleaseDescriptor::named("Movie 2020 1080p BluRay HDR10 x265-GRP")
    };
    // Carries our resolution, HDR terms and group tag; the tier exception
    // still wins.
    let candidate = CandidateMatch::named("Movie.2020.2160p.BluRay.HDR10.1080p.x265-GRP");

    for destination in ["BLU", "RF", "AITHER", "ANT"] {
        assert!(
            matcher
                .filter(std::slice::from_ref(&candidate), &release, &id(destination))
                .is_empty(),
            "{destination} should exclude the 2160p listing"
        );
    }
}

#[test]
fn test_season_pack_matches_any_requested_episode() {
    let matcher = DuplicateMatcher::default();
    let pack = CandidateMatch::named("Show.S01.1080p.WEB-DL.DDP5.1.H.264");

    for episode in ["E01", "E02", "E09", "E10E11"] {
        let release = ReleaseDescriptor {
            episode: Some(episode.to_string()),
            ..web_episode()
        };
        assert_eq!(
            matcher.filter(std::slice::from_ref(&pack), &release, &id("BLU")).len(),
            1,
            "season pack should cover {episode}"
        );
    }

    let other_episode = CandidateMatch::named("Show.S01E05.1080p.WEB-DL.DDP5.1.H.264");
    assert!(matcher
        .filter(&[other_episode], &web_episode(), &id("BLU"))
        .is_empty());

    let other_season = CandidateMatch::named("Show.S02.1080p.WEB-DL.DDP5.1.H.264");
    assert!(matcher
        .filter(&[other_season], &web_episode(), &id("BLU"))
        .is_empty());
}

#[test]
fn test_sparse_descriptors_never_panic() {
    let matcher = DuplicateMatcher::new(PolicyTable::builtin());
    let releases = vec![
        ReleaseDescriptor::default(),
        ReleaseDescriptor::named("x"),
        ReleaseDescriptor {
            category: Some(Category::Tv),
            ..ReleaseDescriptor::default()
        },
        ReleaseDescriptor {
            category: Some(Category::Tv),
            season: Some("season one".to_string()),
            episode: Some("E".to_string()),
            ..ReleaseDescriptor::default()
        },
        ReleaseDescriptor {
            disc: Some(DiscKind::Bdmv),
            tag: Some("-".to_string()),
            ..ReleaseDescriptor::default()
        },
        ReleaseDescriptor {
            disc: Some(DiscKind::Dvd),
            sd: true,
            file_size: Some(0),
            video_codec: Some("x264".to_string()),
            resolution: Some("1080p".to_string()),
            ..ReleaseDescriptor::default()
        },
        ReleaseDescriptor {
            files: vec![String::new(), "/".to_string()],
            hdr: Some(String::new()),
            release_type: Some(ReleaseType::Hdtv),
            ..ReleaseDescriptor::default()
        },
    ];
    let candidates = vec![
        CandidateMatch::default(),
        CandidateMatch::named("...."),
        CandidateMatch::named("S01E"),
        CandidateMatch::named("ée.s99999999999e0101.2160p"),
        CandidateMatch {
            name: "Movie.1080p.x264".to_string(),
            size: Some(0),
            files: vec![String::new()],
            file_count: Some(0),
            ..CandidateMatch::default()
        },
    ];
    let destinations = [
        "AITHER", "BHD", "MTV", "AR", "RTF", "LST", "HDB", "ANT", "HUNO", "RF", "BLU",
    ];

    for release in &releases {
        for destination in destinations {
            let report = matcher.evaluate(&candidates, release, &id(destination));
            assert!(report.dupes.len() <= candidates.len());
            // One candidate at a time exercises the single-result rules.
            for candidate in &candidates {
                let _ = matcher.filter(std::slice::from_ref(candidate), release, &id(destination));
            }
        }
    }
}

#[test]
fn test_absent_fields_impose_no_constraint() {
    let matcher = DuplicateMatcher::default();
    let release = ReleaseDescriptor::named("Some Release");
    let candidates = vec![
        CandidateMatch::named("Completely.Different.720p.HDTV"),
        CandidateMatch::named("Show.S05E09.2160p.DV.HDR"),
    ];

    // Nothing is known about the release, so nothing can rule a listing out.
    let dupes = matcher.filter(&candidates, &release, &id("BLU"));
    assert_eq!(dupes, candidates);

    // An explicitly empty HDR field means SDR, which does constrain.
    let sdr = ReleaseDescriptor {
        hdr: Some(String::new()),
        ..release
    };
    let dupes = matcher.filter(&candidates, &sdr, &id("BLU"));
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].name, "Completely.Different.720p.HDTV");
}

#[test]
fn test_multi_season_pack_is_duplicate_of_episode() {
    let matcher = DuplicateMatcher::default();
    let pack = CandidateMatch::named("Show.S01-S03.1080p.WEB-DL.DDP5.1.H.264-GRP");

    assert_eq!(
        matcher.filter(std::slice::from_ref(&pack), &web_episode(), &id("BLU")),
        vec![pack.clone()]
    );

    let later = ReleaseDescriptor {
        season: Some("S04".to_string()),
        ..web_episode()
    };
    assert!(matcher.filter(&[pack], &later, &id("BLU")).is_empty());
}

#[test]
fn test_repack_keeps_listing_of_group_named_inside_title() {
    let matcher = DuplicateMatcher::default();
    let release = ReleaseDescriptor {
        category: Some(Category::Movie),
        release_type: Some(ReleaseType::Encode),
        resolution: Some("1080p".to_string()),
        repack: true,
        tag: Some("-DON".to_string()),
        ..ReleaseDescriptor::named("London 2020 REPACK 1080p BluRay x264-DON")
    };
    let candidate = CandidateMatch::named("London.2020.1080p.BluRay.x264-OTHER");

    assert_eq!(
        matcher.filter(std::slice::from_ref(&candidate), &release, &id("BLU")),
        vec![candidate]
    );
}
