use crate::models::{ChunkMetadata, LogicalDocument};

pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Collapses an unordered set of chunk records into one logical document per
/// distinct `file_id`, keeping the record with the strictly-latest timestamp
/// (first seen wins on exact ties), sorted newest first and capped at
/// `limit`. Pure; never touches storage.
pub fn latest_per_file(records: &[(String, ChunkMetadata)], limit: usize) -> Vec<LogicalDocument> {
    let mut latest: Vec<(&str, &ChunkMetadata)> = Vec::new();

    for (file_id, metadata) in records {
        match latest.iter_mut().find(|(seen, _)| *seen == file_id.as_str()) {
            Some(entry) => {
                if metadata.timestamp > entry.1.timestamp {
                    entry.1 = metadata;
                }
            }
            None => latest.push((file_id.as_str(), metadata)),
        }
    }

    let mut documents: Vec<LogicalDocument> = latest
        .into_iter()
        .map(|(file_id, metadata)| LogicalDocument {
            uid: file_id.to_string(),
            name: metadata.file_name.clone(),
            doc_type: metadata.doc_type.clone(),
            description: metadata.description.clone(),
            status: "done".to_string(),
            upload_time: metadata.timestamp,
        })
        .collect();

    // Stable sort keeps first-seen order on equal timestamps.
    documents.sort_by(|left, right| right.upload_time.cmp(&left.upload_time));
    documents.truncate(limit);
    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn record(file_id: &str, file_name: &str, timestamp: DateTime<Utc>) -> (String, ChunkMetadata) {
        (
            file_id.to_string(),
            ChunkMetadata {
                file_name: file_name.to_string(),
                file_type: "text/plain".to_string(),
                file_size: 1,
                description: String::new(),
                doc_type: "document".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                timestamp,
            },
        )
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn keeps_only_the_latest_record_per_file() {
        let records = vec![
            record("A", "a-v1.txt", at(1)),
            record("A", "a-v2.txt", at(2)),
            record("B", "b.txt", at(3)),
        ];

        let documents = latest_per_file(&records, DEFAULT_LIST_LIMIT);

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].uid, "B");
        assert_eq!(documents[1].uid, "A");
        assert_eq!(documents[1].name, "a-v2.txt");
        assert_eq!(documents[1].upload_time, at(2));
    }

    #[test]
    fn first_seen_wins_on_exact_timestamp_tie() {
        let records = vec![
            record("A", "first.txt", at(5)),
            record("A", "second.txt", at(5)),
        ];

        let documents = latest_per_file(&records, DEFAULT_LIST_LIMIT);

        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].name, "first.txt");
    }

    #[test]
    fn result_is_sorted_newest_first_and_capped() {
        let records = vec![
            record("A", "a.txt", at(1)),
            record("B", "b.txt", at(3)),
            record("C", "c.txt", at(2)),
        ];

        let documents = latest_per_file(&records, 2);

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].uid, "B");
        assert_eq!(documents[1].uid, "C");
    }

    #[test]
    fn listed_documents_are_marked_done() {
        let records = vec![record("A", "a.txt", at(1))];
        let documents = latest_per_file(&records, DEFAULT_LIST_LIMIT);
        assert_eq!(documents[0].status, "done");
    }
}
