use anyhow::{Context, Result};
use log::info;

use crate::duration::Duration;
use crate::error::SlipError;
use crate::slip::{parse_name, Slip, NAME_SEPARATOR};
use crate::store::RecordStore;

/// `switch`で完了させたタイムスリップの説明文。
pub const SWITCHED_DESCRIPTION: &str = "Switched to new task";

/// 作業中のタイムスリップを操作する。
pub struct Tracker<'a, S: RecordStore> {
    store: &'a S,
}

impl<'a, S: RecordStore> Tracker<'a, S> {
    /// 新しい`Tracker`を返す。
    ///
    /// # Arguments
    /// * `store` - タイムスリップを保存するストア
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// 作業中のタイムスリップを読み込む。
    pub fn pending(&self) -> Result<Slip> {
        let record = self
            .store
            .read_pending()
            .context("Failed to read pending timeslip")?
            .ok_or(SlipError::NoPending)?;

        Ok(Slip::from_json(record.as_bytes())?)
    }

    /// 新しいタイムスリップを開始する。
    ///
    /// 作業中のタイムスリップが既にある場合はエラーを返す。
    /// `.Task`形式の名前は現在のプロジェクトのタスクとして扱う。
    pub fn start(&self, name: &str) -> Result<Slip> {
        if self.store.pending_exists()? {
            let pending = self.pending()?;
            return Err(SlipError::PendingExists(pending.name()).into());
        }

        let name = self.qualify_name(name)?;
        let slip = Slip::new(&name)?;
        self.save_pending(&slip)?;
        info!("Started timeslip {}", slip.name());

        Ok(slip)
    }

    pub fn pause(&self) -> Result<Slip> {
        self.update_pending(Slip::pause)
    }

    pub fn resume(&self) -> Result<Slip> {
        self.update_pending(Slip::resume)
    }

    /// 作業中のタイムスリップの作業時間を調整する。
    ///
    /// 作業中の場合は一時停止してから調整し、再開する。
    pub fn adjust_pending(&self, delta: &Duration) -> Result<Slip> {
        self.update_pending(|slip| {
            if slip.is_running() {
                slip.pause()?;
                slip.adjust(delta)?;
                slip.resume()
            } else {
                slip.adjust(delta)
            }
        })
    }

    /// 作業中のタイムスリップを完了させ、プロジェクトの記録に追加する。
    pub fn done(&self, description: &str) -> Result<Slip> {
        let mut slip = self.pending()?;
        slip.done(description)?;

        let record = slip.to_json()?;
        self.store
            .append_completed(&slip.project, &record)
            .context("Failed to save completed timeslip")?;
        self.store
            .clear_pending()
            .context("Pending timeslip may not have been deleted")?;
        info!("Completed timeslip {}", slip.name());

        Ok(slip)
    }

    /// 作業中のタイムスリップを破棄する。
    pub fn delete(&self) -> Result<()> {
        if !self.store.pending_exists()? {
            return Err(SlipError::NoPending.into());
        }

        self.store
            .clear_pending()
            .context("Unable to delete pending timeslip")?;
        info!("Deleted pending timeslip");

        Ok(())
    }

    /// 作業中のタイムスリップを完了させ、新しいタイムスリップを開始する。
    ///
    /// 新しい名前が不正な場合は、作業中のタイムスリップを変更しない。
    pub fn switch(&self, name: &str) -> Result<Slip> {
        let name = self.qualify_name(name)?;
        parse_name(&name)?;

        if self.store.pending_exists()? {
            let finished = self.done(SWITCHED_DESCRIPTION)?;
            info!("Switched away from {}", finished.name());
        }

        self.start(&name)
    }

    pub fn current_project(&self) -> Result<Option<String>> {
        self.store.current_project()
    }

    pub fn set_current_project(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(NAME_SEPARATOR) {
            return Err(SlipError::InvalidName.into());
        }

        self.store.set_current_project(name)?;
        info!("Current project set to {}", name);

        Ok(())
    }

    fn qualify_name(&self, name: &str) -> Result<String> {
        match name.strip_prefix(NAME_SEPARATOR) {
            Some(task) => {
                let project = self
                    .store
                    .current_project()?
                    .ok_or(SlipError::InvalidName)?;
                Ok(format!("{}{}{}", project, NAME_SEPARATOR, task))
            }
            None => Ok(name.to_string()),
        }
    }

    fn save_pending(&self, slip: &Slip) -> Result<()> {
        let record = slip.to_json()?;
        self.store
            .write_pending(&record)
            .context("Unable to save pending timeslip")
    }

    /// 作業中のタイムスリップを読み込んで変更し、保存する。失敗した場合は保存しない。
    fn update_pending<F>(&self, update: F) -> Result<Slip>
    where
        F: FnOnce(&mut Slip) -> Result<(), SlipError>,
    {
        let mut slip = self.pending()?;
        update(&mut slip)?;
        self.save_pending(&slip)?;
        info!("Pending timeslip updated: {}", slip);

        Ok(slip)
    }
}

#[cfg(test)]
mod tests {
    use super::{Tracker, SWITCHED_DESCRIPTION};
    use crate::datetime::mock_datetime;
    use crate::duration::Duration;
    use crate::error::SlipError;
    use crate::slip::{Slip, Status};
    use crate::store::MockRecordStore;

    const NOW: i64 = 1_706_833_230;

    fn pending(status: Status, started_ago: i64, modified_ago: i64, worked: i64) -> String {
        Slip {
            project: "Acme".to_string(),
            task: "Build".to_string(),
            started: NOW - started_ago,
            modified: NOW - modified_ago,
            worked,
            status,
            uuid: "fixed".to_string(),
            ..Slip::default()
        }
        .to_json()
        .unwrap()
    }

    fn with_pending(record: String) -> MockRecordStore {
        mock_datetime::set_mock_timestamp(NOW);
        let mut store = MockRecordStore::new();
        store.expect_pending_exists().returning(|| Ok(true));
        store
            .expect_read_pending()
            .returning(move || Ok(Some(record.clone())));
        store
    }

    fn saved(record: &str) -> Slip {
        Slip::from_json(record.as_bytes()).unwrap()
    }

    fn slip_error(err: &anyhow::Error) -> &SlipError {
        err.downcast_ref::<SlipError>().unwrap()
    }

    #[test]
    fn test_start() {
        mock_datetime::set_mock_timestamp(NOW);
        let mut store = MockRecordStore::new();
        store.expect_pending_exists().returning(|| Ok(false));
        store
            .expect_write_pending()
            .withf(|record| saved(record).name() == "Acme.Build")
            .times(1)
            .returning(|_| Ok(()));

        let slip = Tracker::new(&store).start("Acme.Build").unwrap();

        assert_eq!(slip.status, Status::Started);
        assert_eq!(slip.started, NOW);
    }

    #[test]
    fn test_start_with_pending() {
        let mut store = with_pending(pending(Status::Started, 60, 60, 0));
        store.expect_write_pending().never();

        let err = Tracker::new(&store).start("Other").unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::PendingExists(name) if name == "Acme.Build"));
    }

    #[test]
    fn test_start_uses_current_project() {
        let mut store = MockRecordStore::new();
        store.expect_pending_exists().returning(|| Ok(false));
        store
            .expect_current_project()
            .returning(|| Ok(Some("Acme".to_string())));
        store.expect_write_pending().returning(|_| Ok(()));

        let slip = Tracker::new(&store).start(".Docs").unwrap();

        assert_eq!(slip.project, "Acme");
        assert_eq!(slip.task, "Docs");
    }

    #[test]
    fn test_start_task_without_current_project() {
        let mut store = MockRecordStore::new();
        store.expect_pending_exists().returning(|| Ok(false));
        store.expect_current_project().returning(|| Ok(None));

        let err = Tracker::new(&store).start(".Docs").unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::InvalidName));
    }

    #[test]
    fn test_pause_saves_slip() {
        let mut store = with_pending(pending(Status::Started, 120, 120, 0));
        store
            .expect_write_pending()
            .withf(|record| saved(record).status == Status::Paused && saved(record).worked == 120)
            .times(1)
            .returning(|_| Ok(()));

        let slip = Tracker::new(&store).pause().unwrap();

        assert_eq!(slip.worked, 120);
    }

    #[test]
    fn test_pause_when_paused_does_not_save() {
        let mut store = with_pending(pending(Status::Paused, 120, 60, 60));
        store.expect_write_pending().never();

        let err = Tracker::new(&store).pause().unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::AlreadyPaused));
    }

    #[test]
    fn test_resume_without_pending() {
        let mut store = MockRecordStore::new();
        store.expect_read_pending().returning(|| Ok(None));

        let err = Tracker::new(&store).resume().unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::NoPending));
    }

    #[test]
    fn test_resume_with_corrupt_pending() {
        let store = with_pending("{corrupt".to_string());

        let err = Tracker::new(&store).resume().unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::Decode(_)));
    }

    #[test]
    fn test_adjust_paused_slip() {
        let mut store = with_pending(pending(Status::Paused, 60, 30, 30));
        store.expect_write_pending().returning(|_| Ok(()));

        let slip = Tracker::new(&store)
            .adjust_pending(&Duration::from_seconds(15))
            .unwrap();

        assert_eq!(slip.worked, 45);
        assert_eq!(slip.modified, NOW - 15);
        assert_eq!(slip.status, Status::Paused);
    }

    /// 作業中の場合は一時停止、調整、再開の順に処理される。
    #[test]
    fn test_adjust_running_slip() {
        let mut store = with_pending(pending(Status::Resumed, 60, 5, 55));
        store.expect_write_pending().returning(|_| Ok(()));

        let slip = Tracker::new(&store)
            .adjust_pending(&Duration::from_seconds(300))
            .unwrap();

        assert_eq!(slip.worked, 360);
        assert_eq!(slip.started, NOW - 360);
        assert_eq!(slip.modified, NOW);
        assert_eq!(slip.status, Status::Resumed);
    }

    #[test]
    fn test_done_appends_and_clears() {
        let mut store = with_pending(pending(Status::Started, 600, 600, 0));
        store
            .expect_append_completed()
            .withf(|project, record| {
                let slip = saved(record);
                project == "Acme"
                    && slip.status == Status::Completed
                    && slip.worked == 600
                    && slip.finished == NOW
            })
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_clear_pending().times(1).returning(|| Ok(()));

        let slip = Tracker::new(&store).done("Shipped it").unwrap();

        assert_eq!(slip.description, "Shipped it");
    }

    #[test]
    fn test_done_keeps_pending_when_append_fails() {
        let mut store = with_pending(pending(Status::Started, 600, 600, 0));
        store
            .expect_append_completed()
            .returning(|_, _| Err(anyhow::anyhow!("disk full")));
        store.expect_clear_pending().never();

        assert!(Tracker::new(&store).done("Shipped it").is_err());
    }

    #[test]
    fn test_delete_without_pending() {
        let mut store = MockRecordStore::new();
        store.expect_pending_exists().returning(|| Ok(false));
        store.expect_clear_pending().never();

        let err = Tracker::new(&store).delete().unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::NoPending));
    }

    #[test]
    fn test_switch_completes_pending_first() {
        let mut store = MockRecordStore::new();
        mock_datetime::set_mock_timestamp(NOW);
        let mut exists = vec![false, true];
        store
            .expect_pending_exists()
            .times(2)
            .returning(move || Ok(exists.pop().unwrap_or(false)));
        let record = pending(Status::Started, 60, 60, 0);
        store
            .expect_read_pending()
            .returning(move || Ok(Some(record.clone())));
        store
            .expect_append_completed()
            .withf(|_, record| saved(record).description == SWITCHED_DESCRIPTION)
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_clear_pending().times(1).returning(|| Ok(()));
        store.expect_write_pending().times(1).returning(|_| Ok(()));

        let slip = Tracker::new(&store).switch("Acme.Review").unwrap();

        assert_eq!(slip.task, "Review");
        assert_eq!(slip.status, Status::Started);
    }

    #[test]
    fn test_switch_invalid_name_keeps_pending() {
        let mut store = with_pending(pending(Status::Started, 60, 60, 0));
        store.expect_append_completed().never();
        store.expect_clear_pending().never();
        store.expect_write_pending().never();

        let err = Tracker::new(&store).switch("a.b.c").unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::InvalidName));
    }

    #[test]
    fn test_set_current_project_rejects_task_name() {
        let mut store = MockRecordStore::new();
        store.expect_set_current_project().never();

        let err = Tracker::new(&store)
            .set_current_project("Acme.Build")
            .unwrap_err();

        assert!(matches!(slip_error(&err), SlipError::InvalidName));
    }
}
