mod common;

use common::{fixture, gzip, write, zstd, COLUMNS};
use csv_validate::{
    Delimiter, DelimiterError, EngineChoice, ExpectedSchema, Stage, Status, StructuralError,
    ValidateError, ValidationMode, Validator, ValidatorConfig, Verdict,
};

fn validator(mode: ValidationMode, engine: EngineChoice) -> Validator {
    let config = ValidatorConfig {
        mode,
        engine,
        ..Default::default()
    };
    Validator::new(config)
        .unwrap()
        .with_expected_schema(ExpectedSchema::new(COLUMNS))
}

fn strict() -> Validator {
    validator(ValidationMode::TrailerCountStrict, EngineChoice::Streaming)
}

fn failure(verdict: &Verdict) -> (Stage, &ValidateError) {
    let failure = verdict.failure.as_ref().expect("verdict should fail");
    (failure.stage, &failure.error)
}

#[tokio::test]
async fn thousand_row_file_passes_and_corrupt_trailer_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let good = write(dir.path(), "good.csv", &fixture(',', 1000, "1000"));
    assert_eq!(std::fs::read_to_string(&good)?.lines().count(), 1002);

    let verdict = strict().validate(&good).await;
    assert_eq!(verdict.status, Status::Pass, "{:?}", verdict.failure);
    assert_eq!(verdict.delimiter, Some(Delimiter::Comma));
    assert_eq!(verdict.row_count, Some(1000));
    // the trailer is parsed as a data row by the header scan
    assert_eq!(verdict.rows_scanned, Some(1001));
    assert_eq!(verdict.method.to_string(), "trailer-count-strict/streaming");

    let bad = write(dir.path(), "bad.csv", &fixture(',', 1000, "999"));
    let verdict = strict().validate(&bad).await;
    assert_eq!(verdict.status, Status::Fail);
    let (stage, error) = failure(&verdict);
    assert_eq!(stage, Stage::Structure);
    assert!(matches!(
        error,
        ValidateError::Structural(StructuralError::RowCountMismatch {
            counted: 1000,
            reported: 999
        })
    ));
    Ok(())
}

#[tokio::test]
async fn compressed_variants_match_plain_verdicts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    for reported in ["1000", "999"] {
        let body = fixture(',', 1000, reported);
        let plain = write(dir.path(), "data.csv", &body);
        let gz = gzip(dir.path(), "data.csv.gz", &body).await?;
        let zst = zstd(dir.path(), "data.csv.zst", &body).await?;

        let expected = strict().validate(&plain).await;
        for path in [gz, zst] {
            let verdict = strict().validate(&path).await;
            assert_eq!(verdict.status, expected.status, "{}", path.display());
            assert_eq!(verdict.row_count, expected.row_count);
            assert_eq!(verdict.rows_scanned, expected.rows_scanned);
        }
    }
    Ok(())
}

#[tokio::test]
async fn renamed_or_reordered_columns_fail_the_schema_stage() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "data.csv", &fixture(',', 10, "10"));

    let renamed = Validator::new(ValidatorConfig::default())?
        .with_expected_schema(ExpectedSchema::new(["id", "name", "total", "region"]));
    let swapped = Validator::new(ValidatorConfig::default())?
        .with_expected_schema(ExpectedSchema::new(["name", "id", "amount", "region"]));

    for validator in [renamed, swapped] {
        let verdict = validator.validate(&path).await;
        let (stage, error) = failure(&verdict);
        assert_eq!(stage, Stage::Schema);
        assert!(matches!(error, ValidateError::SchemaMismatch(m) if m.actual == COLUMNS));
        assert_eq!(verdict.row_count, None, "structure must not run");
    }
    Ok(())
}

#[tokio::test]
async fn validation_is_idempotent() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "data.psv", &fixture('|', 50, "50"));
    let validator = strict();
    let first = validator.validate(&path).await;
    let second = validator.validate(&path).await;
    assert_eq!(first.status, Status::Pass);
    assert_eq!(first.delimiter, Some(Delimiter::Pipe));
    assert_eq!(
        (first.status, first.row_count, first.rows_scanned),
        (second.status, second.row_count, second.rows_scanned)
    );
    Ok(())
}

#[tokio::test]
async fn trailer_count_mode_excludes_only_the_trailer() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let counts_header = write(dir.path(), "a.csv", &fixture(',', 20, "21"));
    let counts_data = write(dir.path(), "b.csv", &fixture(',', 20, "20"));

    let lenient = validator(ValidationMode::TrailerCount, EngineChoice::Streaming);
    assert!(lenient.validate(&counts_header).await.is_pass());
    assert!(!lenient.validate(&counts_data).await.is_pass());

    assert!(!strict().validate(&counts_header).await.is_pass());
    assert!(strict().validate(&counts_data).await.is_pass());
    Ok(())
}

#[tokio::test]
async fn line_without_delimiter_is_reported_by_number() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let body = "id,name,amount,region\n1,a,3,EU\nbroken\n2,b,6,EU\nTRL,20240611,3\n";
    let path = write(dir.path(), "data.csv", body);

    let verdict = strict().validate(&path).await;
    let (stage, error) = failure(&verdict);
    assert_eq!(stage, Stage::Structure);
    assert!(matches!(
        error,
        ValidateError::Structural(StructuralError::MissingDelimiterOnLine(3))
    ));

    // the consistency pass only runs in strict mode
    let lenient = validator(ValidationMode::TrailerCount, EngineChoice::Streaming);
    let lenient_body = body.replace("TRL,20240611,3", "TRL,20240611,4");
    let path = write(dir.path(), "lenient.csv", &lenient_body);
    assert!(lenient.validate(&path).await.is_pass());
    Ok(())
}

#[tokio::test]
async fn undetectable_delimiter_skips_the_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let ambiguous = write(dir.path(), "mixed.csv", "id,name|amount\n1,2|3\n");
    let unknown = write(dir.path(), "notes.txt", "just some notes\n");
    let empty = write(dir.path(), "empty.csv", "");

    for (path, kind) in [
        (ambiguous, DelimiterError::Ambiguous),
        (unknown, DelimiterError::Unknown),
        (empty, DelimiterError::Unknown),
    ] {
        let verdict = strict().validate(&path).await;
        assert_eq!(verdict.status, Status::Fail);
        assert!(verdict.is_skip());
        let (stage, error) = failure(&verdict);
        assert_eq!(stage, Stage::Delimiter);
        assert!(matches!(error, ValidateError::Delimiter(k) if *k == kind));
    }
    Ok(())
}

#[tokio::test]
async fn file_header_mode_needs_no_expected_schema() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "data.csv", "a,b\n1,2\n3,4\n");

    let config = ValidatorConfig {
        mode: ValidationMode::FileHeader,
        ..Default::default()
    };
    let verdict = Validator::new(config)?.validate(&path).await;
    assert!(verdict.is_pass());
    assert_eq!(verdict.rows_scanned, Some(2));
    assert_eq!(verdict.row_count, None);

    let config = ValidatorConfig {
        mode: ValidationMode::ExpectedSchema,
        ..Default::default()
    };
    let verdict = Validator::new(config)?.validate(&path).await;
    assert!(matches!(
        failure(&verdict),
        (Stage::Schema, ValidateError::MissingExpectedSchema)
    ));
    Ok(())
}

#[tokio::test]
async fn no_usable_memory_still_makes_progress() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "data.csv", &fixture(',', 25, "25"));
    let config = ValidatorConfig {
        reserved_memory_bytes: u64::MAX,
        ..Default::default()
    };
    let verdict = Validator::new(config)?
        .with_expected_schema(ExpectedSchema::new(COLUMNS))
        .validate(&path)
        .await;
    assert!(verdict.is_pass(), "{:?}", verdict.failure);
    assert_eq!(verdict.rows_scanned, Some(26));
    Ok(())
}

#[tokio::test]
async fn corrupt_gzip_fails_without_panicking() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "fake.csv.gz", &fixture(',', 5, "5"));
    let verdict = strict().validate(&path).await;
    assert_eq!(verdict.status, Status::Fail);
    let (stage, _) = failure(&verdict);
    assert_eq!(stage, Stage::Delimiter);
    assert!(!verdict.is_skip());
    Ok(())
}

#[tokio::test]
async fn rows_wider_than_the_header_fail_the_scan() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let body = "id,name\n1,a\n2,b\nTRL,20240611,2\n";
    let path = write(dir.path(), "narrow.csv", body);

    let verdict = validator(ValidationMode::FileHeader, EngineChoice::Streaming)
        .validate(&path)
        .await;
    let (stage, error) = failure(&verdict);
    assert_eq!(stage, Stage::Schema);
    assert!(matches!(
        error,
        ValidateError::Structural(StructuralError::TooManyFields {
            line: 4,
            expected: 2
        })
    ));

    // short rows are padded, not rejected
    let ragged = write(dir.path(), "ragged.csv", "a,b,c\n1,2\n3,4,5\n");
    let verdict = validator(ValidationMode::FileHeader, EngineChoice::Streaming)
        .validate(&ragged)
        .await;
    assert!(verdict.is_pass(), "{:?}", verdict.failure);
    Ok(())
}

#[cfg(feature = "columnar")]
#[tokio::test]
async fn engines_reach_the_same_verdicts() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let good = fixture(',', 300, "300");
    let bad_trailer = fixture(',', 300, "299");
    let reordered = good.replacen("id,name", "name,id", 1);
    let short_row = good.replacen("\n7,name_7,21,EU\n", "\n7,name_7\n", 1);
    let wide_row = good.replacen("\n7,name_7,21,EU\n", "\n7,name_7,21,EU,extra\n", 1);
    let wide_trailer = "id,name\n1,a\n2,b\nTRL,20240611,2\n";
    let cases = [
        write(dir.path(), "good.csv", &good),
        write(dir.path(), "bad_trailer.csv", &bad_trailer),
        write(dir.path(), "reordered.csv", &reordered),
        write(dir.path(), "short_row.csv", &short_row),
        write(dir.path(), "wide_row.csv", &wide_row),
        write(dir.path(), "wide_trailer.csv", wide_trailer),
        gzip(dir.path(), "good.csv.gz", &good).await?,
    ];

    for mode in [ValidationMode::FileHeader, ValidationMode::TrailerCountStrict] {
        let streaming = validator(mode, EngineChoice::Streaming);
        let columnar = validator(mode, EngineChoice::Columnar);
        let both = validator(mode, EngineChoice::Both);
        for path in &cases {
            let s = streaming.validate(path).await;
            let c = columnar.validate(path).await;
            let b = both.validate(path).await;
            let name = path.display();
            assert_eq!(s.status, c.status, "{name} {:?}", c.failure);
            assert_eq!(s.status, b.status, "{name}");
            assert_eq!(s.rows_scanned, c.rows_scanned, "{name}");
            let described = |v: &Verdict| v.failure.as_ref().map(ToString::to_string);
            assert_eq!(described(&s), described(&c), "{name}");
            assert_eq!(described(&s), described(&b), "{name}");
            assert_eq!(b.method.to_string(), format!("{}/both", mode.as_str()));
        }
    }

    // the ragged fixtures are actually exercised: short passes, wide fails
    let file_header = validator(ValidationMode::FileHeader, EngineChoice::Both);
    assert!(file_header.validate(&cases[3]).await.is_pass());
    let verdict = file_header.validate(&cases[4]).await;
    assert!(matches!(
        failure(&verdict).1,
        ValidateError::Structural(StructuralError::TooManyFields {
            line: 9,
            expected: 4
        })
    ));
    Ok(())
}
