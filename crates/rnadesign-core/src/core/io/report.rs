use super::traits::OutputFile;
use crate::core::models::ConservationProfile;
use crate::core::utils::matrix::DistanceMatrix;
use std::io::Write;

/// Pairwise matrix with `scaffold_{i}` labels on both axes.
pub struct MatrixCsv;

impl OutputFile for MatrixCsv {
    type Content = DistanceMatrix;
    type Error = csv::Error;

    fn write_to(content: &DistanceMatrix, writer: &mut impl Write) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        let labels: Vec<String> = (0..content.len()).map(|i| format!("scaffold_{i}")).collect();

        let mut header = vec![String::new()];
        header.extend(labels.iter().cloned());
        csv.write_record(&header)?;

        for (i, label) in labels.iter().enumerate() {
            let mut record = vec![label.clone()];
            record.extend(content.row(i).iter().map(usize::to_string));
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }
}

/// One row per position: score, tolerance and raw counts for each alternative base.
pub struct ConservationCsv;

impl OutputFile for ConservationCsv {
    type Content = ConservationProfile;
    type Error = csv::Error;

    fn write_to(content: &ConservationProfile, writer: &mut impl Write) -> Result<(), csv::Error> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "position",
            "base",
            "conservation",
            "alternative",
            "tolerance",
            "attempts",
            "accepts",
        ])?;
        let rows = content
            .sites
            .iter()
            .zip(content.tolerance_matrix())
            .zip(&content.scores)
            .enumerate();
        for (position, ((site, tolerance), score)) in rows {
            let base = content
                .reference
                .get(position)
                .map(|b| b.to_string())
                .unwrap_or_default();
            for k in 0..3 {
                csv.write_record([
                    (position + 1).to_string(),
                    base.clone(),
                    format!("{score:.4}"),
                    site.alternatives[k].to_string(),
                    format!("{:.4}", tolerance[k]),
                    site.attempts[k].to_string(),
                    site.accepts[k].to_string(),
                ])?;
            }
        }
        csv.flush()?;
        Ok(())
    }
}
